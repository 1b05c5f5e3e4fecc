//! Pipeline stages.

use std::fmt;
use std::sync::Arc;

use crate::execute::Launcher;

/// Completion predicate consulted whenever the pipeline queries a stage.
///
/// Returning `false` forces the stage to run again even if it succeeded
/// before. The predicate may have side effects, such as running a cheap
/// external check.
pub type QueryFn = Arc<dyn Fn(&Stage) -> bool + Send + Sync>;

/// A named unit of pipeline work.
///
/// The primary action and the optional clean action are both external
/// commands described by a [`Launcher`].
#[derive(Clone)]
pub struct Stage {
  name: String,
  action: Launcher,
  clean: Option<Launcher>,
  query: Option<QueryFn>,
}

impl Stage {
  pub fn new(name: impl Into<String>, action: Launcher) -> Self {
    Self {
      name: name.into(),
      action,
      clean: None,
      query: None,
    }
  }

  /// Attach the command that undoes this stage's work.
  pub fn with_clean(mut self, clean: Launcher) -> Self {
    self.clean = Some(clean);
    self
  }

  /// Attach a completion predicate.
  pub fn with_query<F>(mut self, query: F) -> Self
  where
    F: Fn(&Stage) -> bool + Send + Sync + 'static,
  {
    self.query = Some(Arc::new(query));
    self
  }

  /// Always report not-completed, leaving staleness checks to the tool itself.
  pub fn always_pending(self) -> Self {
    self.with_query(|_| false)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn action(&self) -> &Launcher {
    &self.action
  }

  pub fn clean_action(&self) -> Option<&Launcher> {
    self.clean.as_ref()
  }

  pub fn has_query(&self) -> bool {
    self.query.is_some()
  }

  /// Runs the completion predicate, if any.
  pub(crate) fn evaluate_query(&self) -> Option<bool> {
    self.query.as_ref().map(|query| query(self))
  }
}

impl fmt::Debug for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Stage")
      .field("name", &self.name)
      .field("action", &self.action)
      .field("clean", &self.clean)
      .field("query", &self.query.is_some())
      .finish()
  }
}
