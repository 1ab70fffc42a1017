//! Ordered extraction fallbacks
//!
//! Portal pages come in several shapes, so most lookups (block titles, link
//! names, download anchors) are a list of alternatives tried in order. Each
//! alternative is a named [`Step`]; [`first_success`] runs them and reports
//! which one produced the value.

/// One named extraction attempt over an input of type `I`
pub struct Step<I: ?Sized, T> {
    pub name: &'static str,
    pub extract: fn(&I) -> Option<T>,
}

impl<I: ?Sized, T> Step<I, T> {
    pub const fn new(name: &'static str, extract: fn(&I) -> Option<T>) -> Self {
        Self { name, extract }
    }
}

impl<I: ?Sized, T> Clone for Step<I, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: ?Sized, T> Copy for Step<I, T> {}

/// Runs `steps` in order and returns the first value produced, with the step name
pub fn first_success<I: ?Sized, T>(steps: &[Step<I, T>], input: &I) -> Option<(&'static str, T)> {
    steps
        .iter()
        .find_map(|step| (step.extract)(input).map(|value| (step.name, value)))
}
