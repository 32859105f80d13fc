//! Classification of the sigil characters that carry patch semantics: a
//! leading sigil on a node or key name selects a command, a trailing sigil on
//! a value key selects an operator, and a `,N`/`,*` suffix selects which
//! duplicate entries to act on.

use std::fmt;

/// What a patch (or a sub-key inside a patch body) does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Insert,
    Edit,
    Copy,
    Delete,
    Replace,
    Create,
    Rename,
    Paste,
    Special,
}

impl Command {
    /// Splits the leading sigil off `name` and classifies it. `Special`
    /// captures the remainder verbatim, including any further sigil, so
    /// `*@PART` classifies as `Special` with name `@PART`.
    pub fn classify(name: &str) -> (Command, &str) {
        let mut chars = name.chars();
        let command = match chars.next() {
            Some('@') => Command::Edit,
            Some('+') | Some('$') => Command::Copy,
            Some('!') | Some('-') => Command::Delete,
            Some('%') => Command::Replace,
            Some('&') => Command::Create,
            Some('|') => Command::Rename,
            Some('#') => Command::Paste,
            Some('*') => Command::Special,
            _ => return (Command::Insert, name),
        };

        (command, chars.as_str())
    }

    /// Only these commands may appear on a root node; the rest are meaningful
    /// inside node-modification sub-keys only.
    pub fn valid_at_root(self) -> bool {
        matches!(
            self,
            Command::Insert | Command::Edit | Command::Copy | Command::Delete
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Command::Insert => "insert",
            Command::Edit => "edit",
            Command::Copy => "copy",
            Command::Delete => "delete",
            Command::Replace => "replace",
            Command::Create => "create",
            Command::Rename => "rename",
            Command::Paste => "paste",
            Command::Special => "special",
        };
        formatter.write_str(name)
    }
}

/// How an operand combines with the current value of a target entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Exponentiate,
    RegexReplace,
}

impl Operator {
    /// Splits a trailing operator sigil off a value key, returning the
    /// operator and the key with the sigil and surrounding whitespace
    /// stripped. The sigil must be separated from the key body by whitespace
    /// (`price *`); a glued character is part of the key, which keeps the
    /// `key,*` all-duplicates selector unambiguous.
    pub fn classify(key: &str) -> (Operator, &str) {
        let trimmed = key.trim();

        let operator = match trimmed.chars().last() {
            Some('+') => Operator::Add,
            Some('-') => Operator::Subtract,
            Some('*') => Operator::Multiply,
            Some('/') => Operator::Divide,
            Some('!') => Operator::Exponentiate,
            Some('^') => Operator::RegexReplace,
            _ => return (Operator::Assign, trimmed),
        };

        let body = &trimmed[..trimmed.len() - 1];
        if body.ends_with(char::is_whitespace) {
            (operator, body.trim_end())
        } else {
            (Operator::Assign, trimmed)
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Operator::Assign => "assign",
            Operator::Add => "add",
            Operator::Subtract => "subtract",
            Operator::Multiply => "multiply",
            Operator::Divide => "divide",
            Operator::Exponentiate => "exponentiate",
            Operator::RegexReplace => "regex-replace",
        };
        formatter.write_str(name)
    }
}

/// Which duplicate entries of a key (or same-named children) a directive
/// selects. Duplicate indices are 0-based; the default is the first entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    First,
    Nth(usize),
    All,
}

impl Index {
    /// Splits a `,N` / `,*` selector off the end of a bare key. A comma
    /// suffix that is neither a number nor `*` is part of the key.
    pub fn classify(key: &str) -> (&str, Index) {
        if let Some(pos) = key.rfind(',') {
            let (body, suffix) = (&key[..pos], &key[pos + 1..]);
            if suffix == "*" {
                return (body, Index::All);
            }
            if let Ok(n) = suffix.parse::<usize>() {
                return (body, Index::Nth(n));
            }
        }

        (key, Index::First)
    }

    /// Resolves the selector against the positions of all same-named entries.
    pub fn select(self, positions: &[usize]) -> Vec<usize> {
        match self {
            Index::First => positions.first().copied().into_iter().collect(),
            Index::Nth(n) => positions.get(n).copied().into_iter().collect(),
            Index::All => positions.to_vec(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn command_sigils() {
        assert_eq!(Command::classify("FURN"), (Command::Insert, "FURN"));
        assert_eq!(Command::classify("@FURN"), (Command::Edit, "FURN"));
        assert_eq!(Command::classify("+FURN"), (Command::Copy, "FURN"));
        assert_eq!(Command::classify("$FURN"), (Command::Copy, "FURN"));
        assert_eq!(Command::classify("!FURN"), (Command::Delete, "FURN"));
        assert_eq!(Command::classify("-FURN"), (Command::Delete, "FURN"));
        assert_eq!(Command::classify("%FURN"), (Command::Replace, "FURN"));
        assert_eq!(Command::classify("&FURN"), (Command::Create, "FURN"));
        assert_eq!(Command::classify("|FURN"), (Command::Rename, "FURN"));
        assert_eq!(Command::classify("#FURN"), (Command::Paste, "FURN"));
    }

    #[test]
    fn special_captures_remainder_verbatim() {
        assert_eq!(Command::classify("*@PART"), (Command::Special, "@PART"));
        assert_eq!(Command::classify("*FOO"), (Command::Special, "FOO"));
    }

    #[test]
    fn root_validity() {
        assert!(Command::Insert.valid_at_root());
        assert!(Command::Edit.valid_at_root());
        assert!(Command::Copy.valid_at_root());
        assert!(Command::Delete.valid_at_root());
        assert!(!Command::Replace.valid_at_root());
        assert!(!Command::Rename.valid_at_root());
        assert!(!Command::Special.valid_at_root());
    }

    #[test]
    fn operator_sigils_require_whitespace() {
        assert_eq!(Operator::classify("price *"), (Operator::Multiply, "price"));
        assert_eq!(Operator::classify(" price + "), (Operator::Add, "price"));
        assert_eq!(Operator::classify("price -"), (Operator::Subtract, "price"));
        assert_eq!(Operator::classify("price /"), (Operator::Divide, "price"));
        assert_eq!(
            Operator::classify("price !"),
            (Operator::Exponentiate, "price")
        );
        assert_eq!(
            Operator::classify("price ^"),
            (Operator::RegexReplace, "price")
        );

        // Glued characters belong to the key, not the operator.
        assert_eq!(Operator::classify("price,*"), (Operator::Assign, "price,*"));
        assert_eq!(Operator::classify("price"), (Operator::Assign, "price"));
    }

    #[test]
    fn index_selectors() {
        assert_eq!(Index::classify("price"), ("price", Index::First));
        assert_eq!(Index::classify("price,2"), ("price", Index::Nth(2)));
        assert_eq!(Index::classify("price,*"), ("price", Index::All));
        assert_eq!(Index::classify("a,b"), ("a,b", Index::First));
    }

    #[test]
    fn index_selection() {
        let positions = vec![3, 5, 9];
        assert_eq!(Index::First.select(&positions), vec![3]);
        assert_eq!(Index::Nth(1).select(&positions), vec![5]);
        assert_eq!(Index::Nth(7).select(&positions), Vec::<usize>::new());
        assert_eq!(Index::All.select(&positions), vec![3, 5, 9]);
    }
}
