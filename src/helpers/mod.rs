pub(crate) mod distinct;
pub(crate) mod joins;
