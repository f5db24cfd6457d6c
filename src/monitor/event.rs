use std::{fmt, path::PathBuf};

use notify::event::{EventKind as NotifyKind, ModifyKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Written,
    Removed,
    Renamed,
    AttributesChanged,
}

impl EventKind {
    pub const COUNT: usize = 5;

    pub const ALL: [EventKind; EventKind::COUNT] = [
        EventKind::Created,
        EventKind::Written,
        EventKind::Removed,
        EventKind::Renamed,
        EventKind::AttributesChanged,
    ];

    pub fn index(self) -> usize {
        match self {
            EventKind::Created => 0,
            EventKind::Written => 1,
            EventKind::Removed => 2,
            EventKind::Renamed => 3,
            EventKind::AttributesChanged => 4,
        }
    }

    pub fn from_notify(kind: &NotifyKind) -> Option<Self> {
        match kind {
            NotifyKind::Create(_) => Some(EventKind::Created),
            NotifyKind::Modify(ModifyKind::Name(_)) => Some(EventKind::Renamed),
            NotifyKind::Modify(ModifyKind::Metadata(_)) => Some(EventKind::AttributesChanged),
            NotifyKind::Modify(_) => Some(EventKind::Written),
            NotifyKind::Remove(_) => Some(EventKind::Removed),
            NotifyKind::Access(_) | NotifyKind::Any | NotifyKind::Other => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Created => "CREATE",
            EventKind::Written => "WRITE",
            EventKind::Removed => "REMOVE",
            EventKind::Renamed => "RENAME",
            EventKind::AttributesChanged => "CHMOD",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

impl FilesystemEvent {
    pub fn new<P: Into<PathBuf>>(path: P, kind: EventKind) -> Self {
        FilesystemEvent {
            path: path.into(),
            kind,
        }
    }

    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        let Some(kind) = EventKind::from_notify(&event.kind) else {
            return vec![];
        };

        event
            .paths
            .into_iter()
            .map(|path| FilesystemEvent::new(path, kind))
            .collect()
    }
}
