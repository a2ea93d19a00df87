use std::fmt::Display;

/// One of the two Mirakurun streams relayed to chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Log,
    Events,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Log, Source::Events];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Log => "log",
            Source::Events => "events",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
