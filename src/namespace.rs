use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashSet;

/// Source of opaque client identifiers
pub trait NamespaceGenerator: Send + Sync {
    /// Produce a fresh identifier
    fn generate(&self) -> String;

    /// Notification that an identifier is no longer in use
    fn release(&self, _id: &str) {}
}

const ID_BITS: u32 = 160;
const RADIX: u32 = 36;

/// Random identifiers drawn from a 160-bit space, rendered in base 36
///
/// Tracks the identifiers it has handed out so a live one is never
/// produced twice.
#[derive(Default)]
pub struct RandomNamespace {
    used: Mutex<HashSet<String>>,
}

impl RandomNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    fn random_id() -> String {
        let mut rng = rand::thread_rng();
        let digits = (ID_BITS as f64 / (RADIX as f64).log2()).ceil() as usize;
        (0..digits)
            .map(|_| {
                let d = rng.gen_range(0..RADIX);
                char::from_digit(d, RADIX).unwrap_or('0')
            })
            .collect()
    }

    pub fn in_use(&self) -> usize {
        self.used.lock().len()
    }
}

impl NamespaceGenerator for RandomNamespace {
    fn generate(&self) -> String {
        let mut used = self.used.lock();
        loop {
            let id = Self::random_id();
            if used.insert(id.clone()) {
                return id;
            }
        }
    }

    fn release(&self, id: &str) {
        self.used.lock().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_base36_and_fixed_width() {
        let ns = RandomNamespace::new();
        let id = ns.generate();
        assert_eq!(id.len(), 31);
        assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_generate_is_unique_and_release_frees() {
        let ns = RandomNamespace::new();
        let ids: HashSet<String> = (0..1000).map(|_| ns.generate()).collect();
        assert_eq!(ids.len(), 1000);
        assert_eq!(ns.in_use(), 1000);

        for id in &ids {
            ns.release(id);
        }
        assert_eq!(ns.in_use(), 0);
    }
}
