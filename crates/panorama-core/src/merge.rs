//! Array merge-by-key: fold one upstream record into an aggregate sub-array.
//!
//! Both operations are pure and idempotent. Elements whose key cannot be
//! extracted never match and are carried through untouched.

/// Insert `incoming` if no element shares its key, otherwise replace the
/// matching element in place.
///
/// If `existing` holds accidental duplicates of the key, the first one is
/// replaced and the rest are dropped, so the result always holds exactly one
/// element with that key. An `incoming` record without a key is appended.
pub fn merge<T, K, F>(existing: Vec<T>, incoming: T, key_of: F) -> Vec<T>
where
  K: PartialEq,
  F: Fn(&T) -> Option<K>,
{
  let Some(key) = key_of(&incoming) else {
    let mut out = existing;
    out.push(incoming);
    return out;
  };

  let mut out = Vec::with_capacity(existing.len() + 1);
  let mut incoming = Some(incoming);
  for element in existing {
    if key_of(&element).as_ref() == Some(&key) {
      // First match takes the new record; later duplicates are dropped.
      if let Some(record) = incoming.take() {
        out.push(record);
      }
    } else {
      out.push(element);
    }
  }
  if let Some(record) = incoming {
    out.push(record);
  }
  out
}

/// Drop every element whose key equals `key`. No-op when absent.
pub fn remove<T, K, F>(existing: Vec<T>, key: &K, key_of: F) -> Vec<T>
where
  K: PartialEq,
  F: Fn(&T) -> Option<K>,
{
  existing
    .into_iter()
    .filter(|e| key_of(e).as_ref() != Some(key))
    .collect()
}
