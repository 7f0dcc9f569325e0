// src/services/chain.rs

//! Prerequisite chain navigation.
//!
//! A stack's challenges form one singly-linked list through
//! `prerequisite_id`. [`ChainIndex`] is built once per stack load; building it
//! validates the list, so navigation afterwards is a map lookup.

use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    models::challenge::Challenge,
    store::Store,
};

#[derive(Debug, Clone)]
pub struct ChainIndex {
    challenges: HashMap<i64, Challenge>,
    /// prerequisite id -> id of the challenge that depends on it
    dependents: HashMap<i64, i64>,
    /// ids from head to tail
    order: Vec<i64>,
}

impl ChainIndex {
    /// Indexes and validates a stack's challenges.
    ///
    /// Fails with `ChainIntegrity` when two challenges share a prerequisite,
    /// when a prerequisite lies outside the stack, when there is more than one
    /// head, or when some challenges sit on a cycle.
    pub fn build(challenges: Vec<Challenge>) -> AppResult<Self> {
        let challenges: HashMap<i64, Challenge> =
            challenges.into_iter().map(|c| (c.id, c)).collect();

        let mut dependents = HashMap::new();
        let mut heads = Vec::new();

        for challenge in challenges.values() {
            let Some(prerequisite) = challenge.prerequisite_id else {
                heads.push(challenge.id);
                continue;
            };
            if !challenges.contains_key(&prerequisite) {
                return Err(AppError::ChainIntegrity(format!(
                    "challenge {} requires challenge {} from another stack",
                    challenge.id, prerequisite
                )));
            }
            if let Some(other) = dependents.insert(prerequisite, challenge.id) {
                return Err(AppError::ChainIntegrity(format!(
                    "challenges {} and {} share prerequisite {}",
                    other, challenge.id, prerequisite
                )));
            }
        }

        if heads.len() > 1 {
            heads.sort_unstable();
            return Err(AppError::ChainIntegrity(format!(
                "stack has several first challenges: {:?}",
                heads
            )));
        }

        let mut order = Vec::with_capacity(challenges.len());
        let mut cursor = heads.first().copied();
        while let Some(id) = cursor {
            if order.len() >= challenges.len() {
                break;
            }
            order.push(id);
            cursor = dependents.get(&id).copied();
        }

        if order.len() != challenges.len() {
            return Err(AppError::ChainIntegrity(format!(
                "{} of {} challenges are unreachable from the first challenge",
                challenges.len() - order.len(),
                challenges.len()
            )));
        }

        Ok(Self {
            challenges,
            dependents,
            order,
        })
    }

    /// Loads and validates the chain of `stack_id`.
    pub async fn load(store: &dyn Store, stack_id: i64) -> AppResult<Self> {
        let challenges = store.challenge_list_by_stack(stack_id).await?;
        Self::build(challenges).inspect_err(|e| {
            tracing::error!(stack_id, error = %e, "Invalid challenge chain");
        })
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Challenge> {
        self.challenges.get(&id)
    }

    pub fn is_first(&self, challenge: &Challenge) -> bool {
        challenge.is_first()
    }

    /// True when no challenge of the stack depends on `challenge`.
    pub fn is_final(&self, challenge: &Challenge) -> bool {
        !self.dependents.contains_key(&challenge.id)
    }

    /// The challenge unlocked after `challenge`, `None` at the tail.
    pub fn next(&self, challenge: &Challenge) -> Option<&Challenge> {
        self.dependents
            .get(&challenge.id)
            .and_then(|id| self.challenges.get(id))
    }

    /// Follows `next` to the tail; `challenge` itself when it is final.
    pub fn final_of<'a>(&'a self, challenge: &'a Challenge) -> AppResult<&'a Challenge> {
        let mut current = challenge;
        for _ in 0..=self.challenges.len() {
            match self.next(current) {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
        Err(AppError::ChainIntegrity(format!(
            "walking from challenge {} did not reach the final challenge",
            challenge.id
        )))
    }

    /// Challenges from first to final.
    pub fn ordered(&self) -> Vec<&Challenge> {
        self.order
            .iter()
            .filter_map(|id| self.challenges.get(id))
            .collect()
    }

    /// Checks that a new challenge with `prerequisite_id` can join the chain:
    /// the prerequisite belongs to the stack and is currently the final
    /// challenge, or the stack is empty when no prerequisite is given.
    pub fn check_append(&self, prerequisite_id: Option<i64>) -> AppResult<()> {
        match prerequisite_id {
            None if self.is_empty() => Ok(()),
            None => Err(AppError::Conflict(
                "Stack already has a first challenge".to_string(),
            )),
            Some(id) => {
                let prerequisite = self.get(id).ok_or_else(|| {
                    AppError::BadRequest(format!("Challenge {} is not part of this stack", id))
                })?;
                if !self.is_final(prerequisite) {
                    return Err(AppError::Conflict(format!(
                        "Challenge {} already has a dependent challenge",
                        id
                    )));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenge(id: i64, prerequisite_id: Option<i64>) -> Challenge {
        Challenge {
            id,
            stack_id: 1,
            title: format!("challenge {}", id),
            description: String::new(),
            prerequisite_id,
            created_at: chrono::Utc::now(),
        }
    }

    fn abc() -> ChainIndex {
        ChainIndex::build(vec![
            challenge(3, Some(2)),
            challenge(1, None),
            challenge(2, Some(1)),
        ])
        .unwrap()
    }

    #[test]
    fn test_next() {
        let chain = abc();
        let (a, b, c) = (chain.get(1).unwrap(), chain.get(2).unwrap(), chain.get(3).unwrap());
        assert_eq!(chain.next(a).map(|c| c.id), Some(2));
        assert_eq!(chain.next(b).map(|c| c.id), Some(3));
        assert!(chain.next(c).is_none());
    }

    #[test]
    fn test_first_and_final() {
        let chain = abc();
        let (a, b, c) = (chain.get(1).unwrap(), chain.get(2).unwrap(), chain.get(3).unwrap());
        assert!(chain.is_first(a) && !chain.is_final(a));
        assert!(!chain.is_first(b) && !chain.is_final(b));
        assert!(!chain.is_first(c) && chain.is_final(c));
    }

    #[test]
    fn test_final_of() {
        let chain = abc();
        for id in 1..=3 {
            let start = chain.get(id).unwrap();
            assert_eq!(chain.final_of(start).unwrap().id, 3);
        }
    }

    #[test]
    fn test_ordered() {
        let ids: Vec<i64> = abc().ordered().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_single_challenge_is_first_and_final() {
        let chain = ChainIndex::build(vec![challenge(9, None)]).unwrap();
        let only = chain.get(9).unwrap();
        assert!(chain.is_first(only));
        assert!(chain.is_final(only));
        assert_eq!(chain.final_of(only).unwrap().id, 9);
    }

    #[test]
    fn test_shared_prerequisite_rejected() {
        let err = ChainIndex::build(vec![
            challenge(1, None),
            challenge(2, Some(1)),
            challenge(3, Some(1)),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::ChainIntegrity(_)));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = ChainIndex::build(vec![
            challenge(1, None),
            challenge(2, Some(3)),
            challenge(3, Some(2)),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::ChainIntegrity(_)));
    }

    #[test]
    fn test_cycle_without_head_rejected() {
        let err = ChainIndex::build(vec![challenge(1, Some(2)), challenge(2, Some(1))]).unwrap_err();
        assert!(matches!(err, AppError::ChainIntegrity(_)));
    }

    #[test]
    fn test_foreign_prerequisite_rejected() {
        let err = ChainIndex::build(vec![challenge(1, None), challenge(2, Some(42))]).unwrap_err();
        assert!(matches!(err, AppError::ChainIntegrity(_)));
    }

    #[test]
    fn test_check_append() {
        let chain = abc();
        assert!(chain.check_append(Some(3)).is_ok());
        assert!(matches!(chain.check_append(Some(1)), Err(AppError::Conflict(_))));
        assert!(matches!(chain.check_append(None), Err(AppError::Conflict(_))));
        assert!(matches!(chain.check_append(Some(99)), Err(AppError::BadRequest(_))));

        let empty = ChainIndex::build(Vec::new()).unwrap();
        assert!(empty.check_append(None).is_ok());
    }
}
