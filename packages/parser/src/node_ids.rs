use crc32fast::Hasher;

/// Allocates stable node ids within one parse.
///
/// Ids are `<document-hash>-<n>`: the document part is a CRC32 of the
/// source path, so re-parsing the same file yields the same ids in the
/// same order, and nodes from different files never collide.
#[derive(Clone)]
pub struct NodeIdAllocator {
    document: String,
    next: u32,
}

impl NodeIdAllocator {
    pub fn for_path(path: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(path.as_bytes());
        Self {
            document: format!("{:x}", hasher.finalize()),
            next: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        self.next += 1;
        format!("{}-{}", self.document, self.next)
    }
}
