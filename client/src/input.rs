//! Line-based command input for the terminal client

/// A parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Direction word sent as-is; the server decides whether it is valid
    Move(String),
    Status,
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> Command {
    match line.trim() {
        "" => Command::Empty,
        "q" | "quit" | "exit" => Command::Quit,
        "s" | "status" => Command::Status,
        word => Command::Move(word.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("  up\n"), Command::Move("up".to_string()));
        assert_eq!(parse_line("sideways"), Command::Move("sideways".to_string()));
        assert_eq!(parse_line("quit"), Command::Quit);
        assert_eq!(parse_line("status"), Command::Status);
        assert_eq!(parse_line("   "), Command::Empty);
    }
}
