//! Per-item outcomes of a batch

use serde::{Deserialize, Serialize};

/// Outcome of one independently settled operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settlement::Fulfilled(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Settlement::Rejected(_))
    }

    pub fn fulfilled(&self) -> Option<&T> {
        match self {
            Settlement::Fulfilled(value) => Some(value),
            Settlement::Rejected(_) => None,
        }
    }

    pub fn rejected(&self) -> Option<&E> {
        match self {
            Settlement::Fulfilled(_) => None,
            Settlement::Rejected(reason) => Some(reason),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        self.into()
    }
}

impl<T, E> From<Result<T, E>> for Settlement<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Settlement::Fulfilled(value),
            Err(reason) => Settlement::Rejected(reason),
        }
    }
}

impl<T, E> From<Settlement<T, E>> for Result<T, E> {
    fn from(settlement: Settlement<T, E>) -> Self {
        match settlement {
            Settlement::Fulfilled(value) => Ok(value),
            Settlement::Rejected(reason) => Err(reason),
        }
    }
}

/// Settlements split by outcome, each side in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled<T, E> {
    pub fulfilled: Vec<T>,
    pub rejected: Vec<E>,
}

impl<T, E> Default for Settled<T, E> {
    fn default() -> Self {
        Self {
            fulfilled: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Partition settlements into fulfilled values and rejection reasons
pub fn reduce_settled<T, E>(settlements: impl IntoIterator<Item = Settlement<T, E>>) -> Settled<T, E> {
    settlements
        .into_iter()
        .fold(Settled::default(), |mut acc, settlement| {
            match settlement {
                Settlement::Fulfilled(value) => acc.fulfilled.push(value),
                Settlement::Rejected(reason) => acc.rejected.push(reason),
            }
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_settled_partitions_in_order() {
        let settled = reduce_settled(vec![
            Settlement::Fulfilled(1),
            Settlement::Rejected("boom"),
            Settlement::Fulfilled(3),
        ]);
        assert_eq!(settled.fulfilled, vec![1, 3]);
        assert_eq!(settled.rejected, vec!["boom"]);
    }

    #[test]
    fn test_reduce_empty() {
        let settled: Settled<u8, String> = reduce_settled(Vec::new());
        assert!(settled.fulfilled.is_empty());
        assert!(settled.rejected.is_empty());
    }

    #[test]
    fn test_result_conversions() {
        let settlement: Settlement<u8, &str> = Err("no").into();
        assert!(settlement.is_rejected());
        assert_eq!(settlement.rejected(), Some(&"no"));
        assert_eq!(Settlement::<u8, &str>::Fulfilled(2).into_result(), Ok(2));
    }
}
