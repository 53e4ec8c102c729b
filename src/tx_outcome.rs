use crate::error::SqlRepoError;
use crate::typed::{AnyTx, TxConn};

/// Result of a repository write.
///
/// With [`CommitMode::Immediate`](crate::repository::CommitMode::Immediate) the transaction is
/// already committed and `is_pending()` is false. With
/// [`CommitMode::Deferred`](crate::repository::CommitMode::Deferred) the open transaction rides
/// along; finish it with [`commit`](Self::commit) or [`rollback`](Self::rollback). Dropping a
/// pending outcome rolls the transaction back.
#[must_use = "a deferred write is rolled back unless committed"]
pub struct TxOutcome<T> {
    value: T,
    pending: Option<AnyTx>,
}

impl<T> TxOutcome<T> {
    pub(crate) fn finished(value: T) -> Self {
        Self {
            value,
            pending: None,
        }
    }

    pub(crate) fn pending(value: T, tx: AnyTx) -> Self {
        Self {
            value,
            pending: Some(tx),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Discard any pending transaction (rolling it back) and keep the value.
    pub fn into_value(self) -> T {
        self.value
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The open transaction, for running further statements before committing.
    pub fn tx_mut(&mut self) -> Option<&mut AnyTx> {
        self.pending.as_mut()
    }

    /// Commit the pending transaction, if any.
    ///
    /// # Errors
    /// Returns the backend error if COMMIT fails.
    pub async fn commit(self) -> Result<T, SqlRepoError> {
        if let Some(tx) = self.pending {
            tx.commit().await?;
        }
        Ok(self.value)
    }

    /// Roll back the pending transaction, if any.
    ///
    /// # Errors
    /// Returns the backend error if ROLLBACK fails.
    pub async fn rollback(self) -> Result<T, SqlRepoError> {
        if let Some(tx) = self.pending {
            tx.rollback().await?;
        }
        Ok(self.value)
    }

    pub fn into_parts(self) -> (T, Option<AnyTx>) {
        (self.value, self.pending)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for TxOutcome<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxOutcome")
            .field("value", &self.value)
            .field("pending", &self.is_pending())
            .finish()
    }
}
