use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Done,
}

impl Status {
    pub fn toggled(self) -> Self {
        match self {
            Status::Active => Status::Done,
            Status::Done => Status::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Done => "done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: u64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub status: Status,
}

impl Todo {
    pub fn new_active(id: u64, title: String, description: String) -> Self {
        Self {
            id,
            title,
            description,
            status: Status::Active,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }
}
