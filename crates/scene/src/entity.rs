use foundation::handles::Handle;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub Handle);

impl EntityId {
    pub(crate) fn from_index(index: u32) -> Self {
        Self(Handle::new(index, 0))
    }

    pub fn index(&self) -> u32 {
        self.0.index()
    }
}
