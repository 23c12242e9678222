//! Compression/encryption registries (spec §6, §9 Design Note: "Dynamic
//! dispatch over backends/compressors/encryptors... registries are plain
//! ordered mappings name -> factory"). The codecs themselves remain
//! external collaborators (spec §1); this module only provides the
//! ordered-registry shape and the handful of identity entries needed so
//! tests can exercise the full filename-probing cross-product (spec §4.10)
//! without a real compression/encryption dependency.

/// An ordered name -> factory mapping, the shape every registry in this
/// module shares.
pub struct Registry<T> {
    entries: Vec<(&'static str, T)>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn register(&mut self, name: &'static str, value: T) -> &mut Self {
        self.entries.push((name, value));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(n, _)| *n).collect()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A compression codec: encodes/decodes whole volume payloads. External
/// collaborator; only the `identity`/`store` entry is provided here so the
/// probing cross-product (spec §4.10) has something concrete to iterate
/// over in tests.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> Vec<u8>;
    fn decompress(&self, data: &[u8]) -> Vec<u8>;
}

pub struct StoreCompressor;

impl Compressor for StoreCompressor {
    fn compress(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    fn decompress(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }
}

/// An encryption codec. External collaborator; only a no-op `none` entry is
/// provided, mirroring the filename grammar's optional encryption suffix
/// (spec §6: `[.<encryption>]`).
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, data: &[u8], passphrase: &str) -> Vec<u8>;
    fn decrypt(&self, data: &[u8], passphrase: &str) -> Vec<u8>;
}

pub struct NoneEncryptor;

impl Encryptor for NoneEncryptor {
    fn encrypt(&self, data: &[u8], _passphrase: &str) -> Vec<u8> {
        data.to_vec()
    }

    fn decrypt(&self, data: &[u8], _passphrase: &str) -> Vec<u8> {
        data.to_vec()
    }
}

/// Builds the default compression registry: just `store` (identity),
/// matching spec §9's note that a "none"/"store" entry is provided so tests
/// exercise the full probing cross-product.
pub fn default_compressors() -> Registry<Box<dyn Compressor>> {
    let mut reg = Registry::new();
    reg.register("store", Box::new(StoreCompressor));
    reg
}

/// Builds the default encryption registry: just `none`. A real encryption
/// module would register e.g. `"aes"` alongside it.
pub fn default_encryptors() -> Registry<Box<dyn Encryptor>> {
    let mut reg = Registry::new();
    reg.register("none", Box::new(NoneEncryptor));
    reg
}

/// The `(compression, encryption)` cross-product [`bvault_common::filename::probe`]
/// needs, including a `None` encryption entry for "no encryption" (spec
/// §4.10).
pub fn probe_candidates<'a>(
    compressors: &'a Registry<Box<dyn Compressor>>,
    encryptors: &'a Registry<Box<dyn Encryptor>>,
) -> Vec<(&'a str, Option<&'a str>)> {
    let mut out = Vec::new();
    for comp in compressors.names() {
        out.push((comp, None));
        for enc in encryptors.names() {
            out.push((comp, Some(enc)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registries_expose_identity_entries() {
        let compressors = default_compressors();
        let encryptors = default_encryptors();
        assert_eq!(compressors.names(), vec!["store"]);
        assert_eq!(encryptors.names(), vec!["none"]);
        assert!(compressors.get("store").is_some());
        assert!(compressors.get("missing").is_none());
    }

    #[test]
    fn probe_candidates_cover_the_cross_product() {
        let compressors = default_compressors();
        let encryptors = default_encryptors();
        let candidates = probe_candidates(&compressors, &encryptors);
        assert_eq!(candidates, vec![("store", None), ("store", Some("none"))]);
    }

    #[test]
    fn store_compressor_round_trips() {
        let c = StoreCompressor;
        let data = b"hello world".to_vec();
        assert_eq!(c.decompress(&c.compress(&data)), data);
    }
}
