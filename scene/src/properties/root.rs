/// `asset` block of a glTF file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetInfo {
    pub generator: Option<String>,
    pub copyright: Option<String>,
}

/// Document-level attributes held by the Root element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootData {
    pub asset: AssetInfo,
}

impl RootData {
    pub fn set_generator(&mut self, generator: impl Into<String>) -> &mut Self {
        self.asset.generator = Some(generator.into());
        self
    }

    pub fn set_copyright(&mut self, copyright: impl Into<String>) -> &mut Self {
        self.asset.copyright = Some(copyright.into());
        self
    }
}
