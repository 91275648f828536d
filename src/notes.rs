use log::info;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::applescript::{self, ScriptOutput, FIELD_DELIMITER, RECORD_DELIMITER};

// ── Records ────────────────────────────────────────────────────────────────

/// Full note record, as returned by a single-note fetch.
///
/// The timestamps are whatever AppleScript's `as string` coercion produced;
/// they are display strings and are never parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub name: String,
    pub body: String,
    pub creation_date: String,
    pub modification_date: String,
}

/// List entry: everything but the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: String,
    pub name: String,
    pub creation_date: String,
    pub modification_date: String,
}

// ── Errors ─────────────────────────────────────────────────────────────────

/// Failures surfaced by the notes service.
///
/// A missing folder, a missing note, Notes not running and a script syntax
/// error all exit osascript with a non-zero status; they are deliberately
/// indistinguishable here, and `External` reports whatever stderr text the
/// interpreter produced, verbatim.
#[derive(Debug, Error)]
pub enum NotesError {
    /// osascript exited non-zero, or could not be spawned at all.
    #[error("{context}: {stderr}")]
    External {
        context: &'static str,
        stderr: String,
    },

    /// osascript exited cleanly but its output did not split into the
    /// expected number of fields.
    #[error("invalid response from AppleScript: expected at least {expected} fields, got {got}")]
    Decode { expected: usize, got: usize },
}

// ── Record decoding ────────────────────────────────────────────────────────

/// Decode the single-line output of a fetch-one script: five fields joined
/// by the field delimiter. Extra fields are ignored; fewer is a protocol
/// mismatch and fails rather than producing a partial record.
fn decode_note(raw: &str) -> Result<Note, NotesError> {
    let parts: Vec<&str> = raw.trim().split(FIELD_DELIMITER).collect();
    if parts.len() < 5 {
        return Err(NotesError::Decode {
            expected: 5,
            got: parts.len(),
        });
    }
    Ok(Note {
        id: parts[0].to_string(),
        name: parts[1].to_string(),
        body: parts[2].to_string(),
        creation_date: parts[3].to_string(),
        modification_date: parts[4].to_string(),
    })
}

/// Decode the output of a list-all script. Empty output is an empty folder,
/// not an error. Records with fewer than four fields are dropped silently;
/// a malformed segment should not cost the caller the rest of the list.
fn decode_note_list(raw: &str) -> Vec<NoteSummary> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    trimmed
        .split(RECORD_DELIMITER)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let parts: Vec<&str> = segment.split(FIELD_DELIMITER).collect();
            if parts.len() < 4 {
                return None;
            }
            Some(NoteSummary {
                id: parts[0].to_string(),
                name: parts[1].to_string(),
                creation_date: parts[2].to_string(),
                modification_date: parts[3].to_string(),
            })
        })
        .collect()
}

// ── Service facade ─────────────────────────────────────────────────────────

/// AppleScript-backed facade over the Notes application.
///
/// Every operation is scoped to the folder named by
/// [`applescript::NOTES_FOLDER`], and mutation is append-only: no operation
/// can overwrite or delete existing note content.
pub struct NotesService;

impl NotesService {
    /// Create a note and return its id (an opaque `x-coredata://` URL).
    pub async fn create_note(&self, title: &str, body: &str) -> Result<String, NotesError> {
        let script = applescript::create_note_script(title, body);
        let output = run(&script, "Failed to create note").await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Fetch one note by id, body included.
    pub async fn get_note(&self, note_id: &str) -> Result<Note, NotesError> {
        let script = applescript::get_note_script(note_id);
        let output = run(&script, "Failed to get note").await?;
        decode_note(&output.stdout)
    }

    /// Append content to an existing note. Success produces no output; the
    /// pre-existing body is always preserved as a prefix of the new one.
    pub async fn append_to_note(&self, note_id: &str, content: &str) -> Result<(), NotesError> {
        let script = applescript::append_to_note_script(note_id, content);
        run(&script, "Failed to append to note").await?;
        Ok(())
    }

    /// List every note in the folder, in the order Notes emits them.
    /// The date parameters are accepted for interface compatibility but are
    /// not applied.
    pub async fn get_notes_list(
        &self,
        _start_date: Option<&str>,
        _end_date: Option<&str>,
    ) -> Result<Vec<NoteSummary>, NotesError> {
        // TODO: filter on creation date when start/end dates are given; for
        // now every note in the folder is returned.
        let script = applescript::list_notes_script();
        let output = run(&script, "Failed to get notes").await?;
        Ok(decode_note_list(&output.stdout))
    }
}

/// Run a script and classify the outcome: a non-zero exit (or a spawn
/// failure) becomes `External` carrying the captured stderr.
async fn run(script: &str, context: &'static str) -> Result<ScriptOutput, NotesError> {
    let output = applescript::run_script(script)
        .await
        .map_err(|err| NotesError::External {
            context,
            stderr: err.to_string(),
        })?;

    if !output.success() {
        return Err(NotesError::External {
            context,
            stderr: output.stderr,
        });
    }

    Ok(output)
}

// ── Singleton ──────────────────────────────────────────────────────────────

static SERVICE: OnceCell<NotesService> = OnceCell::new();

/// Process-wide service instance, created lazily on first use and never
/// torn down.
pub fn notes_service() -> &'static NotesService {
    SERVICE.get_or_init(|| {
        info!("initializing notes service");
        NotesService
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_note_five_fields() {
        let raw = "x-coredata://abc|~|Day 1|~|Slept well.|~|Monday, January 6, 2025 at 08:15:00|~|Monday, January 6, 2025 at 09:00:00\n";
        let note = decode_note(raw).expect("five fields should decode");
        assert_eq!(note.id, "x-coredata://abc");
        assert_eq!(note.name, "Day 1");
        assert_eq!(note.body, "Slept well.");
        assert_eq!(note.creation_date, "Monday, January 6, 2025 at 08:15:00");
        assert_eq!(note.modification_date, "Monday, January 6, 2025 at 09:00:00");
    }

    #[test]
    fn test_decode_note_rejects_short_output() {
        let err = decode_note("id|~|name|~|body").expect_err("three fields must not decode");
        match err {
            NotesError::Decode { expected, got } => {
                assert_eq!(expected, 5);
                assert_eq!(got, 3);
            }
            other => panic!("expected Decode, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_note_rejects_empty_output() {
        assert!(decode_note("").is_err());
        assert!(decode_note("   \n").is_err());
    }

    #[test]
    fn test_decode_note_ignores_extra_fields() {
        // A body containing the field delimiter corrupts the split; the
        // decoder keeps the first five positions, as the protocol defines.
        let note = decode_note("id|~|name|~|body-left|~|body-right|~|created|~|modified")
            .expect("extra fields should still decode");
        assert_eq!(note.body, "body-left");
        assert_eq!(note.creation_date, "body-right");
        assert_eq!(note.modification_date, "created");
    }

    #[test]
    fn test_decode_list_empty_output_is_empty_list() {
        assert!(decode_note_list("").is_empty());
        assert!(decode_note_list("  \n  ").is_empty());
    }

    #[test]
    fn test_decode_list_multiple_records() {
        let raw = "id1|~|First|~|c1|~|m1||id2|~|Second|~|c2|~|m2";
        let notes = decode_note_list(raw);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, "id1");
        assert_eq!(notes[0].name, "First");
        assert_eq!(notes[1].id, "id2");
        assert_eq!(notes[1].modification_date, "m2");
    }

    #[test]
    fn test_decode_list_single_record() {
        let notes = decode_note_list("id1|~|Only|~|c1|~|m1\n");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].name, "Only");
    }

    #[test]
    fn test_decode_list_drops_short_segments() {
        let raw = "id1|~|First|~|c1|~|m1||garbage||id2|~|Second|~|c2|~|m2";
        let notes = decode_note_list(raw);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].id, "id2");
    }

    #[test]
    fn test_decode_list_skips_empty_segments() {
        let notes = decode_note_list("id1|~|First|~|c1|~|m1||");
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_external_error_display_keeps_stderr() {
        let err = NotesError::External {
            context: "Failed to get note",
            stderr: "execution error: Notes got an error (-1728)\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to get note: execution error: Notes got an error (-1728)\n"
        );
    }

    #[test]
    fn test_decode_error_display() {
        let err = NotesError::Decode {
            expected: 5,
            got: 2,
        };
        assert_eq!(
            err.to_string(),
            "invalid response from AppleScript: expected at least 5 fields, got 2"
        );
    }

    #[test]
    fn test_notes_service_singleton_is_shared() {
        let first = notes_service() as *const NotesService;
        let second = notes_service() as *const NotesService;
        assert_eq!(first, second);
    }
}
