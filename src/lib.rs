pub mod applescript;
pub mod mcp;
pub mod notes;

pub use notes::{Note, NoteSummary, NotesError, NotesService};

pub const DEFAULT_MCP_PORT: u16 = 3925;

/// Port for the MCP HTTP server, from INOTES_MCP_PORT when set and valid.
pub fn mcp_port() -> u16 {
    std::env::var("INOTES_MCP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_MCP_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_without_env() {
        // Env mutation is process-wide, so pick a value and restore it.
        let saved = std::env::var("INOTES_MCP_PORT").ok();

        std::env::remove_var("INOTES_MCP_PORT");
        assert_eq!(mcp_port(), DEFAULT_MCP_PORT);

        std::env::set_var("INOTES_MCP_PORT", "4100");
        assert_eq!(mcp_port(), 4100);

        std::env::set_var("INOTES_MCP_PORT", "not-a-port");
        assert_eq!(mcp_port(), DEFAULT_MCP_PORT);

        match saved {
            Some(v) => std::env::set_var("INOTES_MCP_PORT", v),
            None => std::env::remove_var("INOTES_MCP_PORT"),
        }
    }
}
