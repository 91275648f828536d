use std::io;
use std::process::ExitStatus;
use tokio::process::Command;

// ── Protocol constants ─────────────────────────────────────────────────────

/// The one folder every operation is confined to. Deliberately a constant
/// rather than configuration: no code path accepts a caller-supplied folder,
/// so the server cannot touch notes outside it.
pub const NOTES_FOLDER: &str = "Claude Diary";

/// Separates fields within a single record in script output.
pub const FIELD_DELIMITER: &str = "|~|";

/// Separates records when a script returns more than one.
pub const RECORD_DELIMITER: &str = "||";

const OSASCRIPT: &str = "osascript";

// ── Escaping ───────────────────────────────────────────────────────────────

/// Escape a value for embedding inside a double-quoted AppleScript string
/// literal. Backslashes are doubled before quotes are escaped so the
/// backslashes inserted by the second step are not escaped again.
pub fn escape_text(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape a note body or appended content. Same rules as [`escape_text`],
/// plus newlines become `<br>`: Notes renders bodies as HTML-ish text and
/// drops raw newlines, so the marker is needed for display fidelity.
pub fn escape_body(value: &str) -> String {
    escape_text(value).replace('\n', "<br>")
}

// ── Script templates ───────────────────────────────────────────────────────
//
// Four fixed AppleScript programs. The folder name is baked into the create
// and list templates as a literal; only the escaped title/body/id values are
// interpolated from caller input.

/// Create a note in the fixed folder; the script prints the new note's id.
pub fn create_note_script(title: &str, body: &str) -> String {
    format!(
        r#"tell application "Notes"
    tell folder "{folder}"
        set newNote to make new note with properties {{name:"{name}", body:"{body}"}}
        return id of newNote
    end tell
end tell"#,
        folder = NOTES_FOLDER,
        name = escape_text(title),
        body = escape_body(body),
    )
}

/// Look up a note by id and print five fields (id, name, body, creation
/// date, modification date) joined by the field delimiter.
pub fn get_note_script(note_id: &str) -> String {
    format!(
        r#"tell application "Notes"
    set theNote to note id "{id}"
    set noteData to {{}}
    set end of noteData to id of theNote
    set end of noteData to name of theNote
    set end of noteData to body of theNote
    set end of noteData to creation date of theNote as string
    set end of noteData to modification date of theNote as string

    set AppleScript's text item delimiters to "{field}"
    return noteData as text
end tell"#,
        id = escape_text(note_id),
        field = FIELD_DELIMITER,
    )
}

/// Append to a note's body. The new body is always the existing body plus a
/// double break marker plus the new content; nothing is overwritten.
pub fn append_to_note_script(note_id: &str, content: &str) -> String {
    format!(
        r#"tell application "Notes"
    set theNote to note id "{id}"
    set body of theNote to (body of theNote) & "<br><br>{content}"
end tell"#,
        id = escape_text(note_id),
        content = escape_body(content),
    )
}

/// Enumerate every note in the fixed folder; each note contributes four
/// fields (id, name, creation date, modification date) joined by the field
/// delimiter, and the per-note strings are joined by the record delimiter.
pub fn list_notes_script() -> String {
    format!(
        r#"tell application "Notes"
    set allNotes to notes of folder "{folder}"
    set notesList to {{}}
    repeat with theNote in allNotes
        set noteInfo to {{}}
        set end of noteInfo to id of theNote
        set end of noteInfo to name of theNote
        set end of noteInfo to creation date of theNote as string
        set end of noteInfo to modification date of theNote as string
        set end of notesList to noteInfo
    end repeat

    set AppleScript's text item delimiters to "{field}"
    set output to {{}}
    repeat with noteInfo in notesList
        set end of output to noteInfo as text
    end repeat
    set AppleScript's text item delimiters to "{record}"
    return output as text
end tell"#,
        folder = NOTES_FOLDER,
        field = FIELD_DELIMITER,
        record = RECORD_DELIMITER,
    )
}

// ── Process bridge ─────────────────────────────────────────────────────────

/// Everything captured from one interpreter run. A non-zero exit status is
/// not an error at this layer; callers classify it.
#[derive(Debug)]
pub struct ScriptOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run a script through osascript and wait for it to finish. Blocks the
/// caller for as long as the interpreter takes; no timeout is imposed.
/// Errors only when the interpreter cannot be spawned at all.
pub async fn run_script(script: &str) -> io::Result<ScriptOutput> {
    run_command(OSASCRIPT, &["-e", script]).await
}

async fn run_command(program: &str, args: &[&str]) -> io::Result<ScriptOutput> {
    let output = Command::new(program).args(args).output().await?;
    Ok(ScriptOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
