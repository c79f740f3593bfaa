//! Command palette entries and suggestion ranking.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  /// All groups
  Groups,
  /// Global publication feed
  Feed,
  /// Publications by the signed-in user
  Mine,
  /// Groups the signed-in user belongs to
  MyGroups,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: Action,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "groups",
    aliases: &["g", "group"],
    description: "Browse all groups",
    action: Action::Groups,
  },
  Command {
    name: "feed",
    aliases: &["f", "publications", "posts"],
    description: "Latest publications",
    action: Action::Feed,
  },
  Command {
    name: "mine",
    aliases: &["m", "me"],
    description: "Your publications",
    action: Action::Mine,
  },
  Command {
    name: "mygroups",
    aliases: &["mg", "joined"],
    description: "Groups you belong to",
    action: Action::MyGroups,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit greenspace",
    action: Action::Quit,
  },
];

/// How well a command matches, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
  Name,
  Alias,
  NamePrefix,
  AliasPrefix,
  NameContains,
  AliasContains,
}

fn rank(cmd: &Command, input: &str) -> Option<Rank> {
  if cmd.name == input {
    Some(Rank::Name)
  } else if cmd.aliases.contains(&input) {
    Some(Rank::Alias)
  } else if cmd.name.starts_with(input) {
    Some(Rank::NamePrefix)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(Rank::AliasPrefix)
  } else if cmd.name.contains(input) {
    Some(Rank::NameContains)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(Rank::AliasContains)
  } else {
    None
  }
}

/// Matching commands, best match first. Empty input lists everything.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();
  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(Rank, &'static Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &input).map(|r| (r, cmd)))
    .collect();
  // Stable sort keeps declaration order within a rank
  matches.sort_by_key(|(r, _)| *r);
  matches.into_iter().map(|(_, cmd)| cmd).collect()
}

/// Resolve typed input to the best matching action
pub fn resolve(input: &str) -> Option<Action> {
  get_suggestions(input).first().map(|cmd| cmd.action)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("  ").len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_name_beats_prefix() {
    // "mine" is a prefix of nothing else but "m" prefixes both mine and mygroups
    assert_eq!(resolve("mine"), Some(Action::Mine));
    assert_eq!(resolve("m"), Some(Action::Mine));
    assert_eq!(resolve("mg"), Some(Action::MyGroups));
  }

  #[test]
  fn test_alias_and_prefix() {
    assert_eq!(resolve("posts"), Some(Action::Feed));
    assert_eq!(resolve("gro"), Some(Action::Groups));
    assert_eq!(resolve("Q"), Some(Action::Quit));
  }

  #[test]
  fn test_fuzzy_contains() {
    let names: Vec<_> = get_suggestions("roup").iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["groups", "mygroups"]);
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
    assert_eq!(resolve("zzz"), None);
  }
}
