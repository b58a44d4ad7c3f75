use std::fmt;

/// A creator credit attached to a comic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Author {
    pub name: String,
    pub role: Option<Role>,
}

impl Author {
    pub fn new(name: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

impl fmt::Display for Author {
    /// Renders as `"Name (role)"`, or just `"Name"` when no role is known.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            Some(role) => write!(f, "{} ({})", self.name, role.as_str()),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The creative roles recognized by the `ComicInfo.xml` schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Writer,
    Penciller,
    Inker,
    Colorist,
    Letterer,
    CoverArtist,
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Writer => "writer",
            Self::Penciller => "penciller",
            Self::Inker => "inker",
            Self::Colorist => "colorist",
            Self::Letterer => "letterer",
            Self::CoverArtist => "cover_artist",
            Self::Editor => "editor",
        }
    }
}
