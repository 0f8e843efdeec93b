use std::fmt;

use zeroize::Zeroizing;

use crate::{
    asymmetric::{AsymmetricScheme, PrivateKey, PublicKey},
    envelope::{Envelope, SchemeId, SchemeParams},
    error::{CryptoError, KeyKind},
    kdf::Salt,
    password::PasswordScheme,
    symmetric::SymmetricScheme,
};

/// The key handed to [`EncryptionScheme::seal`] or [`EncryptionScheme::open`].
#[derive(Clone, Copy)]
pub enum KeyMaterial<'a> {
    /// `salt` is only read when opening; `None` uses the salt stored in the
    /// envelope. Sealing always draws a fresh salt.
    Password {
        password: &'a str,
        salt: Option<&'a [u8]>,
    },
    Symmetric(&'a [u8]),
    Public(&'a PublicKey),
    Private(&'a PrivateKey),
}

impl<'a> KeyMaterial<'a> {
    pub fn password(password: &'a str) -> Self {
        KeyMaterial::Password { password, salt: None }
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            KeyMaterial::Password { .. } => KeyKind::Password,
            KeyMaterial::Symmetric(_) => KeyKind::Symmetric,
            KeyMaterial::Public(_) => KeyKind::Public,
            KeyMaterial::Private(_) => KeyKind::Private,
        }
    }
}

impl fmt::Debug for KeyMaterial<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Public(key) => f.debug_tuple("Public").field(key).finish(),
            other => write!(f, "KeyMaterial::{:?}(<redacted>)", other.kind()),
        }
    }
}

/// Output of [`EncryptionScheme::seal`]. `salt` is set for the password
/// scheme and must be kept to decrypt with an out-of-band salt.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub bytes: Vec<u8>,
    pub salt: Option<Salt>,
}

/// One of the three schemes, chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionScheme {
    Password(PasswordScheme),
    Symmetric(SymmetricScheme),
    Asymmetric(AsymmetricScheme),
}

impl EncryptionScheme {
    pub fn id(&self) -> SchemeId {
        match self {
            EncryptionScheme::Password(_) => SchemeId::Password,
            EncryptionScheme::Symmetric(_) => SchemeId::Symmetric,
            EncryptionScheme::Asymmetric(_) => SchemeId::Asymmetric,
        }
    }

    /// Key kind accepted by `seal`.
    pub fn sealing_key(&self) -> KeyKind {
        match self {
            EncryptionScheme::Password(_) => KeyKind::Password,
            EncryptionScheme::Symmetric(_) => KeyKind::Symmetric,
            EncryptionScheme::Asymmetric(_) => KeyKind::Public,
        }
    }

    /// Key kind accepted by `open`.
    pub fn opening_key(&self) -> KeyKind {
        match self {
            EncryptionScheme::Asymmetric(_) => KeyKind::Private,
            other => other.sealing_key(),
        }
    }

    /// Encrypt `plaintext` and serialize the envelope.
    pub fn seal(&self, plaintext: &[u8], key: &KeyMaterial<'_>) -> Result<Sealed, CryptoError> {
        let (envelope, salt) = match (self, key) {
            (EncryptionScheme::Password(scheme), KeyMaterial::Password { password, .. }) => {
                let (envelope, salt) = scheme.encrypt(plaintext, password)?;
                (envelope, Some(salt))
            }
            (EncryptionScheme::Symmetric(scheme), KeyMaterial::Symmetric(bytes)) => {
                (scheme.encrypt(plaintext, bytes)?, None)
            }
            (EncryptionScheme::Asymmetric(scheme), KeyMaterial::Public(public)) => {
                (scheme.encrypt(plaintext, public)?, None)
            }
            (scheme, key) => {
                return Err(CryptoError::KeyUsage {
                    expected: scheme.sealing_key(),
                    found: key.kind(),
                })
            }
        };
        Ok(Sealed {
            bytes: envelope.to_bytes()?,
            salt,
        })
    }

    /// Parse and decrypt envelope bytes. The key kind is checked before the
    /// envelope is even parsed.
    pub fn open(&self, bytes: &[u8], key: &KeyMaterial<'_>) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if key.kind() != self.opening_key() {
            return Err(CryptoError::KeyUsage {
                expected: self.opening_key(),
                found: key.kind(),
            });
        }
        let envelope = Envelope::from_bytes(bytes)?;
        envelope.expect_scheme(self.id())?;

        match (self, key) {
            (EncryptionScheme::Password(scheme), KeyMaterial::Password { password, salt }) => {
                match (salt, &envelope.params) {
                    (Some(salt), _) => scheme.decrypt(&envelope, password, salt),
                    (None, SchemeParams::Password { salt, .. }) => {
                        scheme.decrypt(&envelope, password, salt.as_slice())
                    }
                    (None, other) => Err(CryptoError::SchemeMismatch {
                        expected: SchemeId::Password,
                        found: other.scheme(),
                    }),
                }
            }
            (EncryptionScheme::Symmetric(scheme), KeyMaterial::Symmetric(bytes)) => {
                scheme.decrypt(&envelope, bytes)
            }
            (EncryptionScheme::Asymmetric(scheme), KeyMaterial::Private(private)) => {
                scheme.decrypt(&envelope, private)
            }
            (scheme, key) => Err(CryptoError::KeyUsage {
                expected: scheme.opening_key(),
                found: key.kind(),
            }),
        }
    }
}

impl From<PasswordScheme> for EncryptionScheme {
    fn from(scheme: PasswordScheme) -> Self {
        EncryptionScheme::Password(scheme)
    }
}

impl From<SymmetricScheme> for EncryptionScheme {
    fn from(scheme: SymmetricScheme) -> Self {
        EncryptionScheme::Symmetric(scheme)
    }
}

impl From<AsymmetricScheme> for EncryptionScheme {
    fn from(scheme: AsymmetricScheme) -> Self {
        EncryptionScheme::Asymmetric(scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::KdfParams;

    fn fast() -> KdfParams {
        KdfParams::new(64, 1, 1).expect("params")
    }

    #[test]
    fn private_key_cannot_encrypt() {
        let scheme = EncryptionScheme::from(AsymmetricScheme::new(fast()));
        let pair = AsymmetricScheme::new(fast()).generate_keys();
        let err = scheme.seal(b"x", &KeyMaterial::Private(&pair.private)).map(|_| ());
        assert_eq!(
            err,
            Err(CryptoError::KeyUsage {
                expected: KeyKind::Public,
                found: KeyKind::Private,
            })
        );
    }

    #[test]
    fn public_key_cannot_decrypt_even_garbage() {
        let scheme = EncryptionScheme::from(AsymmetricScheme::new(fast()));
        let pair = AsymmetricScheme::new(fast()).generate_keys();
        // Key kind is checked before the bytes are looked at.
        let err = scheme.open(b"not an envelope", &KeyMaterial::Public(&pair.public));
        assert_eq!(
            err,
            Err(CryptoError::KeyUsage {
                expected: KeyKind::Private,
                found: KeyKind::Public,
            })
        );
    }

    #[test]
    fn mismatched_key_kinds_are_refused() {
        let password = EncryptionScheme::from(PasswordScheme::new(fast()));
        let symmetric = EncryptionScheme::from(SymmetricScheme);
        let key = [0u8; 32];

        assert!(matches!(
            password.seal(b"x", &KeyMaterial::Symmetric(&key)),
            Err(CryptoError::KeyUsage { .. })
        ));
        assert!(matches!(
            symmetric.seal(b"x", &KeyMaterial::password("pw")),
            Err(CryptoError::KeyUsage { .. })
        ));
    }

    #[test]
    fn every_scheme_round_trips_through_bytes() {
        let pair = AsymmetricScheme::new(fast()).generate_keys();
        let key = [7u8; 32];
        let cases = [
            (
                EncryptionScheme::from(PasswordScheme::new(fast())),
                KeyMaterial::password("correct"),
                KeyMaterial::password("correct"),
            ),
            (
                EncryptionScheme::from(SymmetricScheme),
                KeyMaterial::Symmetric(&key),
                KeyMaterial::Symmetric(&key),
            ),
            (
                EncryptionScheme::from(AsymmetricScheme::new(fast())),
                KeyMaterial::Public(&pair.public),
                KeyMaterial::Private(&pair.private),
            ),
        ];
        for (scheme, seal_key, open_key) in cases {
            let sealed = scheme.seal(b"host=127.0.0.1", &seal_key).expect("seal");
            assert_eq!(sealed.salt.is_some(), scheme.id() == SchemeId::Password);
            assert_eq!(Envelope::detect(&sealed.bytes), Some(scheme.id()));

            let plaintext = scheme.open(&sealed.bytes, &open_key).expect("open");
            assert_eq!(plaintext.as_slice(), b"host=127.0.0.1", "{}", scheme.id());
        }
    }

    #[test]
    fn password_open_prefers_the_supplied_salt() {
        let scheme = EncryptionScheme::from(PasswordScheme::new(fast()));
        let sealed = scheme.seal(b"x", &KeyMaterial::password("pw")).expect("seal");
        let salt = sealed.salt.expect("password scheme returns a salt");

        let with_salt = KeyMaterial::Password {
            password: "pw",
            salt: Some(salt.as_bytes()),
        };
        assert!(scheme.open(&sealed.bytes, &with_salt).is_ok());

        let other = Salt::generate();
        let wrong_salt = KeyMaterial::Password {
            password: "pw",
            salt: Some(other.as_bytes()),
        };
        assert_eq!(scheme.open(&sealed.bytes, &wrong_salt), Err(CryptoError::Decryption));
    }

    #[test]
    fn envelope_from_another_scheme_is_a_mismatch() {
        let key = [1u8; 32];
        let sealed = EncryptionScheme::from(SymmetricScheme)
            .seal(b"x", &KeyMaterial::Symmetric(&key))
            .expect("seal");
        let err = EncryptionScheme::from(PasswordScheme::new(fast()))
            .open(&sealed.bytes, &KeyMaterial::password("pw"));
        assert_eq!(
            err,
            Err(CryptoError::SchemeMismatch {
                expected: SchemeId::Password,
                found: SchemeId::Symmetric,
            })
        );
    }

    #[test]
    fn key_material_debug_hides_secrets() {
        let key = [9u8; 32];
        let text = format!("{:?} {:?}", KeyMaterial::password("hunter2"), KeyMaterial::Symmetric(&key));
        assert!(!text.contains("hunter2"));
        assert!(!text.contains('9'));
    }
}
