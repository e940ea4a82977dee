use crate::events::VadOutput;

/// Per-frame notification sink.
///
/// Called synchronously on the caller's side, once per successfully processed
/// frame and never for a failed one. An error returned here is propagated to
/// the caller of `process` as `VadError::Observer`.
pub trait VadObserver: Send + Sync + 'static {
    fn on_frame(&self, output: &VadOutput) -> anyhow::Result<()>;
}

impl<F> VadObserver for F
where
    F: Fn(&VadOutput) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn on_frame(&self, output: &VadOutput) -> anyhow::Result<()> {
        self(output)
    }
}
