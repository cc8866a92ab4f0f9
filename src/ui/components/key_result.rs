/// Outcome of offering a key to a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the view to do
  Handled,
  /// Consumed, and the view should act on this
  Event(T),
  /// Not consumed, the view may use the key itself
  NotHandled,
}
