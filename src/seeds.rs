//! Built-in content: the regex challenges, quick-play drills and the level catalog.
//! Guarantees the app is useful without any external config.

use crate::domain::{Challenge, DrillPattern, GameInfo};

/// Id of the only level with real gameplay.
pub const REGEX_GAME_ID: &str = "regex";

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|s| s.to_string()).collect()
}

pub fn seed_challenges() -> Vec<Challenge> {
  vec![
    Challenge {
      id: 1,
      title: "Email Detective".into(),
      description: "Create a regex pattern that matches valid email addresses".into(),
      should_match: strings(&["user@example.com", "test.email@domain.org", "hello@test.co.uk"]),
      should_not_match: strings(&["invalid.email", "@domain.com", "user@", "user@.com"]),
      canonical_solution: Some(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$".into()),
      hints: strings(&[
        "Start with ^ to match the beginning",
        "Use + to match one or more characters",
        "Don't forget the @ symbol",
        "End with $ to match the end",
      ]),
      points: 100,
    },
    Challenge {
      id: 2,
      title: "Phone Number Hunter".into(),
      description: "Match US phone numbers in format (123) 456-7890".into(),
      should_match: strings(&["(123) 456-7890", "(555) 123-4567", "(999) 888-7777"]),
      should_not_match: strings(&["123-456-7890", "(12) 456-7890", "(123) 45-7890", "123 456 7890"]),
      canonical_solution: Some(r"^\(\d{3}\) \d{3}-\d{4}$".into()),
      hints: strings(&[
        r"Parentheses need to be escaped: \( \)",
        r"\d matches any digit",
        "{3} means exactly 3 times",
        "Don't forget the space after the area code",
      ]),
      points: 150,
    },
    Challenge {
      id: 3,
      title: "Password Validator".into(),
      description: "Match passwords with at least 8 characters, containing letters and numbers".into(),
      should_match: strings(&["password123", "MyPass12", "secure123password"]),
      should_not_match: strings(&["password", "12345678", "Pass1", "short"]),
      canonical_solution: Some(r"^(?=.*[a-zA-Z])(?=.*\d).{8,}$".into()),
      hints: strings(&[
        "Use positive lookahead: (?=.*pattern)",
        "Check for at least one letter: [a-zA-Z]",
        r"Check for at least one digit: \d",
        "Minimum 8 characters: .{8,}",
      ]),
      points: 200,
    },
  ]
}

pub fn seed_drills() -> Vec<DrillPattern> {
  let drill = |text: &str, solution: &str, hint: &str| DrillPattern {
    text: text.into(),
    solution: solution.into(),
    hint: hint.into(),
  };
  vec![
    drill("123", r"\d+", r"Use \d+ to match one or more digits"),
    drill("abc", "[a-z]+", "Use [a-z]+ to match one or more lowercase letters"),
    drill("ABC", "[A-Z]+", "Use [A-Z]+ to match one or more uppercase letters"),
    drill("cat", "[a-z]{3}", "Match exactly 3 lowercase letters"),
    drill("555-123-4567", r"\d{3}-\d{3}-\d{4}", "Match a phone number pattern"),
    drill("hello world", r"[a-z]+\s[a-z]+", "Match two words with a space between"),
    drill("apple42", r"[a-z]+\d+", "Match letters followed by numbers"),
    drill("colour", "colou?r", "Match both spellings using an optional character"),
  ]
}

/// The seven levels in unlock order. Only `regex` has gameplay; the rest are progression slots.
pub fn seed_catalog() -> Vec<GameInfo> {
  let game = |id: &str, name: &str, description: &str, level: u32, color: &str, icon: &str| GameInfo {
    id: id.into(),
    name: name.into(),
    description: description.into(),
    level,
    color: color.into(),
    icon: icon.into(),
  };
  vec![
    game(REGEX_GAME_ID, "Regex Detective", "Solve cyber mysteries with pattern matching", 1, "#00FFFF", "🔍"),
    game("tetris", "Neon Tetris", "Classic blocks with cyberpunk style", 2, "#FF00FF", "🧱"),
    game("snake", "Snake Evolution", "Evolve from worm to cosmic serpent", 3, "#32CD32", "🐍"),
    game("pong", "Pong Dimension", "Reality-bending paddle battles", 4, "#FFD700", "🏓"),
    game("breakout", "Breakout Shift", "Break through dimensional barriers", 5, "#FF6B6B", "🎯"),
    game("invaders", "Space Invaders Remix", "Defend against the alien armada", 6, "#4ECDC4", "🚀"),
    game("final", "The Final Fusion", "All games become one epic challenge", 7, "#9B59B6", "👑"),
  ]
}
