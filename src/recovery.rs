use crate::error::RecoveryError;
use crate::model::note::NoteRecord;
use log::{debug, info, warn};
use serde_json::Value;

const NOTES_MARKERS: [&str; 2] = ["\"notes\": [", "\"notes\":["];
const CLOSING: &str = "]}";

/// Recovers the model's note list from its raw text output.
///
/// Strategies are tried in order and the first one that produces a non-empty `notes` array wins:
/// a strict parse of the whole text, then a parse after anchoring on the `"notes"` marker and
/// closing an unterminated array/object, then progressively shorter prefixes made of the
/// complete `{...}` note objects found in the array.
pub fn recover(text: &str) -> Result<Vec<NoteRecord>, RecoveryError> {
    let raw = recover_raw(text)?;
    let total = raw.len();

    let notes = raw
        .iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let note = NoteRecord::from_json(value);
            if note.is_none() {
                warn!("Skipping notes[{}], it is not an object: {}..!", i, value);
            }
            note
        })
        .collect::<Vec<_>>();

    if notes.is_empty() {
        return Err(RecoveryError::EmptyNotes);
    }

    debug!("Recovered {} of {} note entries..!", notes.len(), total);
    Ok(notes)
}

/// Same as [`recover`] but hands back the untouched JSON elements of the array.
pub fn recover_raw(text: &str) -> Result<Vec<Value>, RecoveryError> {
    let mut saw_empty = false;

    match try_parse(text) {
        Some(notes) if !notes.is_empty() => {
            debug!("Model output parsed as-is..!");
            return Ok(notes);
        }
        Some(_) => saw_empty = true,
        None => {}
    }

    let Some(marker_idx) = NOTES_MARKERS.iter().filter_map(|m| text.find(m)).min() else {
        return Err(RecoveryError::MissingNotesArray);
    };

    // The nearest `{` before the marker strips leading prose, but lands inside an earlier
    // field when that field holds an object or a brace. The whole trimmed text covers that.
    let anchored = anchor_object(text, marker_idx);
    let whole = text.trim();

    let mut bases = vec![anchored];
    if whole != anchored {
        bases.push(whole);
    }

    for base in bases {
        if let Some(notes) = repair(base, &mut saw_empty) {
            return Ok(notes);
        }
    }

    // Only an array that parsed cleanly counts as genuinely empty.
    Err(if saw_empty {
        RecoveryError::EmptyNotes
    } else {
        RecoveryError::Unrecoverable
    })
}

/// Closes a truncated array/object, then retries progressively shorter prefixes of the
/// complete note objects.
fn repair(base: &str, saw_empty: &mut bool) -> Option<Vec<Value>> {
    let repaired = close_truncated(base);

    match try_parse(&repaired) {
        Some(notes) if !notes.is_empty() => {
            info!("Recovered notes after closing the truncated array..!");
            return Some(notes);
        }
        Some(_) => *saw_empty = true,
        None => {}
    }

    let (Some(start), Some(end)) = (repaired.find('['), repaired.rfind(']')) else {
        return None;
    };

    if end <= start {
        return None;
    }

    let head = &repaired[..=start];
    let content = repaired[start + 1..end].trim();
    let objects = complete_objects(content);

    debug!(
        "Found {} complete note object(s) to try prefixes of..!",
        objects.len()
    );

    let cuts = objects
        .iter()
        .rev()
        .map(|&(_, obj_end)| obj_end)
        .chain(std::iter::once(0));

    for (dropped, cut) in cuts.enumerate() {
        let kept = content[..cut].trim_end_matches([',', ' ', '\n']);
        let attempt = format!("{}{}{}", head, kept, CLOSING);

        if let Some(notes) = try_parse(&attempt)
            && !notes.is_empty()
        {
            info!(
                "Recovered {} note(s) after dropping {} trailing object(s)..!",
                notes.len(),
                dropped
            );
            return Some(notes);
        }
    }

    None
}

/// Strict parse. `None` when the text isn't a JSON object, otherwise the `notes` array
/// (missing or non-array counts as empty).
fn try_parse(text: &str) -> Option<Vec<Value>> {
    let value: Value = serde_json::from_str(text).ok()?;
    let Value::Object(mut fields) = value else {
        return None;
    };

    match fields.remove("notes") {
        Some(Value::Array(notes)) => Some(notes),
        _ => Some(Vec::new()),
    }
}

/// Drops any prose in front of the object that owns the notes marker.
fn anchor_object(text: &str, marker_idx: usize) -> &str {
    match text[..marker_idx].rfind('{') {
        Some(open) => text[open..].trim(),
        None => text.trim(),
    }
}

fn close_truncated(text: &str) -> String {
    let mut fixed = text.to_owned();

    if !fixed.ends_with(CLOSING) {
        if !fixed.ends_with(']') {
            fixed.push(']');
        }
        if !fixed.ends_with(CLOSING) {
            fixed.push('}');
        }
    }

    fixed
}

/// Byte ranges of every `{` .. next `}` run in `content`, scanning left to right.
fn complete_objects(content: &str) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(open) = content[pos..].find('{').map(|i| pos + i) {
        let Some(close) = content[open + 1..].find('}').map(|i| open + 1 + i) else {
            break;
        };

        found.push((open, close + 1));
        pos = close + 1;
    }

    found
}

#[cfg(test)]
mod test {
    use super::*;

    const EXAMPLE: &str = r#"{
  "notes": [
    {"pitch": 64, "start_time": 0, "duration": 480, "velocity": 80},
    {"pitch": 67, "start_time": 0, "duration": 480, "velocity": 70},
    {"pitch": 71, "start_time": 0, "duration": 480, "velocity": 60},
    {"pitch": 72, "start_time": 480, "duration": 240, "velocity": 80}
  ]
}"#;

    #[test]
    fn valid_json_is_returned_in_order() {
        env_logger::try_init().unwrap_or(());

        let notes = recover(EXAMPLE).unwrap();
        assert_eq!(
            notes,
            vec![
                NoteRecord::new(64, 0, 480, 80),
                NoteRecord::new(67, 0, 480, 70),
                NoteRecord::new(71, 0, 480, 60),
                NoteRecord::new(72, 480, 240, 80),
            ]
        );
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let notes = recover(r#"{"notes":[{"pitch":62},{"start_time":960,"velocity":99}]}"#).unwrap();
        assert_eq!(
            notes,
            vec![
                NoteRecord::new(62, 0, 480, 80),
                NoteRecord::new(60, 960, 480, 99),
            ]
        );
    }

    #[test]
    fn truncated_mid_object_keeps_complete_prefix() {
        env_logger::try_init().unwrap_or(());

        let text = r#"{"notes": [{"pitch":64,"start_time":0,"duration":480,"velocity":80},{"pitch":67,"start_time":0,"dur"#;
        let notes = recover(text).unwrap();
        assert_eq!(notes, vec![NoteRecord::new(64, 0, 480, 80)]);
    }

    #[test]
    fn truncated_after_complete_object_is_closed() {
        let text = r#"{"notes": [{"pitch":64,"start_time":0,"duration":480,"velocity":80},
            {"pitch":67,"start_time":480,"duration":480,"velocity":70}"#;
        let notes = recover(text).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].pitch, 67);
    }

    #[test]
    fn truncated_after_separator() {
        let text = "{\"notes\": [{\"pitch\":64,\"start_time\":0,\"duration\":480,\"velocity\":80},\n";
        let notes = recover(text).unwrap();
        assert_eq!(notes, vec![NoteRecord::new(64, 0, 480, 80)]);
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        env_logger::try_init().unwrap_or(());

        let text = format!(
            "Sure! Here is your jazz tune:\n{}\nLet me know if you want another one.",
            EXAMPLE
        );
        let notes = recover(&text).unwrap();
        assert_eq!(notes.len(), 4);
        assert_eq!(notes[3], NoteRecord::new(72, 480, 240, 80));
    }

    #[test]
    fn nested_field_before_notes_keeps_complete_prefix() {
        env_logger::try_init().unwrap_or(());

        let text = r#"{"meta": {"key": "C"}, "notes": [{"pitch":64,"start_time":0,"duration":480,"velocity":80},{"pitch":67,"dur"#;
        assert_eq!(recover(text).unwrap(), vec![NoteRecord::new(64, 0, 480, 80)]);
    }

    #[test]
    fn brace_inside_earlier_string_keeps_complete_prefix() {
        let text = r#"{"title": "tune {1}", "notes": [{"pitch":64,"start_time":0,"duration":480,"velocity":80},{"pitch":67,"dur"#;
        assert_eq!(recover(text).unwrap(), vec![NoteRecord::new(64, 0, 480, 80)]);
    }

    #[test]
    fn nested_field_before_notes_is_closed() {
        let text = r#"{"meta": {"key": "C", "tempo": 120}, "notes": [{"pitch":60},{"pitch":62}"#;
        let notes = recover(text).unwrap();
        assert_eq!(notes.iter().map(|n| n.pitch).collect::<Vec<_>>(), vec![60, 62]);
    }

    #[test]
    fn garbage_in_the_middle_drops_the_tail() {
        let text = r#"{"notes": [{"pitch":60,"start_time":0,"duration":480,"velocity":80},{"pitch":62,"start_time":480,"duration":480,"velocity":80},{"pitch": sixty-four}, {"pitch":65"#;
        let notes = recover(text).unwrap();
        assert_eq!(
            notes.iter().map(|n| n.pitch).collect::<Vec<_>>(),
            vec![60, 62]
        );
    }

    #[test]
    fn missing_marker_fails_quietly() {
        assert_eq!(
            recover("I'm sorry, I can't write music today."),
            Err(RecoveryError::MissingNotesArray)
        );
        assert_eq!(recover(""), Err(RecoveryError::MissingNotesArray));
        assert_eq!(
            recover(r#"{"melody": [1, 2, 3]}"#),
            Err(RecoveryError::MissingNotesArray)
        );
    }

    #[test]
    fn empty_array_is_a_failure() {
        assert_eq!(recover(r#"{"notes": []}"#), Err(RecoveryError::EmptyNotes));
    }

    #[test]
    fn hopeless_array_is_unrecoverable() {
        assert_eq!(
            recover(r#"{"notes": [ pitch sixty, start now ]"#),
            Err(RecoveryError::Unrecoverable)
        );
    }

    #[test]
    fn non_object_entries_are_skipped() {
        let notes = recover(r#"{"notes": [60, {"pitch": 61}, "x"]}"#).unwrap();
        assert_eq!(notes, vec![NoteRecord::new(61, 0, 480, 80)]);
        assert_eq!(recover(r#"{"notes": [60, 62]}"#), Err(RecoveryError::EmptyNotes));
    }

    #[test]
    fn recovery_is_deterministic() {
        let text = r#"{"notes": [{"pitch":64},{"pitch":65},{"pi"#;
        assert_eq!(recover(text), recover(text));
        assert_eq!(recover(text).unwrap().len(), 2);
    }

    #[test]
    fn close_truncated_appends_only_what_is_missing() {
        assert_eq!(close_truncated("{\"notes\": [{}"), "{\"notes\": [{}]}");
        assert_eq!(close_truncated("{\"notes\": [{}]"), "{\"notes\": [{}]}");
        assert_eq!(close_truncated("{\"notes\": [{}]}"), "{\"notes\": [{}]}");
    }

    #[test]
    fn complete_objects_skip_unterminated_tail() {
        let content = r#"{"a":1}, {"b":2},{"c""#;
        assert_eq!(complete_objects(content), vec![(0, 7), (9, 16)]);
    }
}
