/// Destination for packed binary data. Holds no bytes itself; accessors and
/// textures linked to it are packed into it on write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferData {
    /// File name used when the buffer is written as an external resource.
    pub uri: Option<String>,
}

impl BufferData {
    pub fn set_uri(&mut self, uri: impl Into<String>) -> &mut Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn clear_uri(&mut self) -> &mut Self {
        self.uri = None;
        self
    }
}
