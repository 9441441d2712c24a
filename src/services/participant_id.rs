use std::future::Future;

use rand::Rng;

pub const PARTICIPANT_ID_LEN: usize = 5;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Collision budget for the uniqueness loop. At 62^5 possible identifiers a
/// retry is already rare; hitting the cap means the store is misbehaving.
const MAX_ATTEMPTS: usize = 32;

#[derive(Debug)]
pub enum IdGenError<E> {
    /// Every candidate within the attempt budget was already taken.
    Exhausted { attempts: usize },
    /// The uniqueness check itself failed.
    Store(E),
}

/// Draws a 5-character identifier uniformly from `[A-Za-z0-9]`. Not
/// cryptographically secure; these are public badge codes, not secrets.
pub fn generate_participant_id() -> String {
    let mut rng = rand::thread_rng();
    (0..PARTICIPANT_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generates candidates until `is_taken` clears one, giving up after
/// `MAX_ATTEMPTS` so a wedged store cannot spin this forever. The check is
/// injected so tests can run against a fake store.
pub async fn generate_unique_participant_id<F, Fut, E>(
    mut is_taken: F,
) -> Result<String, IdGenError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    for _ in 0..MAX_ATTEMPTS {
        let candidate = generate_participant_id();
        let taken = is_taken(candidate.clone())
            .await
            .map_err(IdGenError::Store)?;
        if !taken {
            return Ok(candidate);
        }
    }
    Err(IdGenError::Exhausted {
        attempts: MAX_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_matches_expected_shape() {
        for _ in 0..100 {
            let id = generate_participant_id();
            assert_eq!(id.len(), PARTICIPANT_ID_LEN);
            assert!(id.bytes().all(|b| b.is_ascii_alphanumeric()));
        }
    }

    #[tokio::test]
    async fn retries_until_candidate_is_free() {
        let mut rejected = 0;
        let id = generate_unique_participant_id(|_candidate| {
            let taken = rejected < 3;
            rejected += 1;
            async move { Ok::<_, ()>(taken) }
        })
        .await
        .unwrap();
        assert_eq!(rejected, 4);
        assert_eq!(id.len(), PARTICIPANT_ID_LEN);
    }

    #[tokio::test]
    async fn gives_up_when_every_candidate_is_taken() {
        let err = generate_unique_participant_id(|_candidate| async { Ok::<_, ()>(true) })
            .await
            .unwrap_err();
        assert!(matches!(err, IdGenError::Exhausted { attempts: 32 }));
    }

    #[tokio::test]
    async fn store_failure_aborts_immediately() {
        let mut calls = 0;
        let err = generate_unique_participant_id(|_candidate| {
            calls += 1;
            async { Err::<bool, _>("store down") }
        })
        .await
        .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, IdGenError::Store("store down")));
    }
}
