use std::fmt;
use std::str::FromStr;

use tracing::{
  debug,
  trace
};

use crate::todo::{
  Status,
  Todo
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum Filter {
  #[default]
  All,
  Active,
  Done
}

impl Filter {
  pub fn as_str(self) -> &'static str {
    match self {
      | Filter::All => "all",
      | Filter::Active => "active",
      | Filter::Done => "done"
    }
  }

  /// Parses a filter name. Only the
  /// exact lowercase names `active` and
  /// `done` narrow the view; anything
  /// else selects `All`.
  pub fn parse_lenient(
    raw: &str
  ) -> Self {
    match raw {
      | "active" => Filter::Active,
      | "done" => Filter::Done,
      | "all" => Filter::All,
      | other => {
        debug!(
          filter = %other,
          "unrecognised filter; showing all"
        );
        Filter::All
      }
    }
  }

  fn status(self) -> Option<Status> {
    match self {
      | Filter::All => None,
      | Filter::Active => {
        Some(Status::Active)
      }
      | Filter::Done => {
        Some(Status::Done)
      }
    }
  }

  pub fn matches(
    self,
    todo: &Todo
  ) -> bool {
    self
      .status()
      .is_none_or(|s| todo.status == s)
  }
}

impl FromStr for Filter {
  type Err = std::convert::Infallible;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Ok(Self::parse_lenient(s))
  }
}

impl fmt::Display for Filter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Holds the current view filter.
#[derive(Debug, Clone, Default)]
pub struct FilterSelector {
  current: Filter
}

impl FilterSelector {
  pub fn new(initial: Filter) -> Self {
    Self {
      current: initial
    }
  }

  pub fn current(&self) -> Filter {
    self.current
  }

  #[tracing::instrument(skip(self))]
  pub fn set_filter(
    &mut self,
    filter: Filter
  ) {
    trace!(
      from = %self.current,
      to = %filter,
      "filter changed"
    );
    self.current = filter;
  }

  /// Visible subset of `list`, order
  /// preserved.
  pub fn apply<'a>(
    &self,
    list: &'a [Todo]
  ) -> Vec<&'a Todo> {
    let filter = self.current;
    list
      .iter()
      .filter(|todo| filter.matches(todo))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Vec<Todo> {
    let mut done = Todo::new_active(
      1,
      "b".to_string(),
      String::new()
    );
    done.status = Status::Done;
    vec![
      Todo::new_active(
        0,
        "a".to_string(),
        String::new()
      ),
      done,
      Todo::new_active(
        2,
        "c".to_string(),
        String::new()
      ),
    ]
  }

  fn ids(list: &[&Todo]) -> Vec<u64> {
    list.iter().map(|t| t.id).collect()
  }

  #[test]
  fn all_returns_list_unchanged() {
    let list = sample();
    let selector =
      FilterSelector::default();
    assert_eq!(
      ids(&selector.apply(&list)),
      vec![0, 1, 2]
    );
  }

  #[test]
  fn status_filters_keep_order() {
    let list = sample();
    let mut selector =
      FilterSelector::default();

    selector.set_filter(Filter::Active);
    assert_eq!(
      ids(&selector.apply(&list)),
      vec![0, 2]
    );

    selector.set_filter(Filter::Done);
    assert_eq!(
      ids(&selector.apply(&list)),
      vec![1]
    );
  }

  #[test]
  fn unknown_names_fall_back_to_all() {
    assert_eq!(
      Filter::parse_lenient("someday"),
      Filter::All
    );
    assert_eq!(
      "done".parse::<Filter>(),
      Ok(Filter::Done)
    );
  }

  #[test]
  fn names_are_matched_exactly() {
    for raw in
      ["DONE", " done", "Active", ""]
    {
      assert_eq!(
        Filter::parse_lenient(raw),
        Filter::All,
        "{raw:?}"
      );
    }
  }
}
