pub mod monitor;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;
