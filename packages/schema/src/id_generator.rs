use crate::BlockId;
use crc32fast::Hasher;

/// Seed for block ids derived from a project id using CRC32
pub fn get_seed(project_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"project://");
    hasher.update(project_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential id generator for blocks within a project.
///
/// The counter only moves forward. A project stores its high-water mark so
/// an id handed out once is never handed out again, even after the block
/// carrying it is removed.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(project_id: &str) -> Self {
        Self::resume(project_id, 0)
    }

    /// Continue a sequence that already handed out `count` ids
    pub fn resume(project_id: &str, count: u64) -> Self {
        Self {
            seed: get_seed(project_id),
            count,
        }
    }

    /// Generate next sequential id
    pub fn new_id(&mut self) -> BlockId {
        self.count += 1;
        BlockId::new(format!("{}-{}", self.seed, self.count))
    }

    /// Number of ids handed out so far
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Recover the sequence number of an id minted by this generator's seed
    pub fn sequence_of(&self, id: &BlockId) -> Option<u64> {
        id.as_str()
            .strip_prefix(self.seed.as_str())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_generation() {
        let a = get_seed("proj-1");
        let b = get_seed("proj-1");
        assert_eq!(a, b);
        assert_ne!(a, get_seed("proj-2"));
    }

    #[test]
    fn test_sequential_ids() {
        let mut gen = IdGenerator::new("proj-1");

        let id1 = gen.new_id();
        let id2 = gen.new_id();

        assert!(id1.as_str().ends_with("-1"));
        assert!(id2.as_str().ends_with("-2"));
        assert!(id1.as_str().starts_with(gen.seed()));
        assert_eq!(gen.count(), 2);
    }

    #[test]
    fn test_resume_continues_sequence() {
        let mut gen = IdGenerator::resume("proj-1", 41);
        let id = gen.new_id();
        assert_eq!(gen.sequence_of(&id), Some(42));
    }

    #[test]
    fn test_sequence_of_foreign_id() {
        let gen = IdGenerator::new("proj-1");
        assert_eq!(gen.sequence_of(&BlockId::new("hero")), None);
        assert_eq!(gen.sequence_of(&BlockId::new(format!("{}-x", gen.seed()))), None);
    }
}
