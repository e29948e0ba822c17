use std::fmt;

use serde::Serialize;

/// A rendered directory listing, as produced by `DirectoryNode::ls`.
///
/// ```text
/// extracts/
/// ├── raw/
/// │   └── 12 csv items
/// ├── a_2020-01-01.csv
/// └── cleaned.csv [2024-05-01 13:45 1a2b3c4]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub label: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Listing>,
}

impl Listing {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            is_dir: false,
            children: Vec::new(),
        }
    }

    pub fn dir(label: impl Into<String>, children: Vec<Listing>) -> Self {
        Self {
            label: label.into(),
            is_dir: true,
            children,
        }
    }

    fn display_label(&self) -> String {
        if self.is_dir {
            format!("{}/", self.label)
        } else {
            self.label.clone()
        }
    }

    fn fmt_children(&self, f: &mut fmt::Formatter<'_>, prefix: &str) -> fmt::Result {
        for (i, child) in self.children.iter().enumerate() {
            let is_last = i + 1 == self.children.len();
            let branch = if is_last { "└── " } else { "├── " };
            writeln!(f, "{prefix}{branch}{}", child.display_label())?;

            let continuation = if is_last { "    " } else { "│   " };
            child.fmt_children(f, &format!("{prefix}{continuation}"))?;
        }
        Ok(())
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.display_label())?;
        self.fmt_children(f, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_leaf() {
        assert_eq!(Listing::leaf("a.csv").to_string(), "a.csv\n");
    }

    #[test]
    fn test_nested() {
        let listing = Listing::dir(
            "root",
            vec![
                Listing::dir("raw", vec![Listing::leaf("12 csv items")]),
                Listing::leaf("a.csv"),
            ],
        );
        assert_eq!(
            listing.to_string(),
            "root/\n├── raw/\n│   └── 12 csv items\n└── a.csv\n"
        );
    }

    #[test]
    fn test_deep_last_branch_uses_blank_continuation() {
        let listing = Listing::dir(
            "root",
            vec![Listing::dir(
                "only",
                vec![Listing::leaf("x.txt"), Listing::leaf("y.txt")],
            )],
        );
        assert_eq!(
            listing.to_string(),
            "root/\n└── only/\n    ├── x.txt\n    └── y.txt\n"
        );
    }
}
