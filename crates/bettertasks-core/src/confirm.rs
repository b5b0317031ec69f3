/// Two-state confirmation flow: closed, or open and holding the target the
/// pending action will run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPrompt<T> {
    Closed,
    Pending(T),
}

impl<T> Default for ConfirmPrompt<T> {
    fn default() -> Self {
        ConfirmPrompt::Closed
    }
}

impl<T> ConfirmPrompt<T> {
    /// Opens the prompt for `target`, replacing any earlier pending target.
    pub fn open(&mut self, target: T) {
        *self = ConfirmPrompt::Pending(target);
    }

    pub fn cancel(&mut self) -> Option<T> {
        match std::mem::replace(self, ConfirmPrompt::Closed) {
            ConfirmPrompt::Pending(target) => Some(target),
            ConfirmPrompt::Closed => None,
        }
    }

    pub fn pending(&self) -> Option<&T> {
        match self {
            ConfirmPrompt::Pending(target) => Some(target),
            ConfirmPrompt::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConfirmPrompt::Pending(_))
    }

    /// Runs `action` against the pending target. The prompt closes only when
    /// the action succeeds; a failure leaves it open on the same target.
    /// Returns `Ok(None)` when nothing was pending.
    pub fn confirm<R, E>(
        &mut self,
        action: impl FnOnce(&T) -> Result<R, E>,
    ) -> Result<Option<R>, E> {
        let ConfirmPrompt::Pending(target) = self else {
            return Ok(None);
        };
        let out = action(target)?;
        *self = ConfirmPrompt::Closed;
        Ok(Some(out))
    }
}
