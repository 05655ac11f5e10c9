// legal-backend/src/infrastructure/encryption.rs
//! フィールド単位の暗号化ケイパビリティ
//!
//! エクスポート処理は暗号方式を知らず、[`FieldCipher`] を介して復号だけを行う。
//! 本番用のアダプタは AES-256-GCM（`aes-gcm` クレート）。

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub const AES_256_GCM: &str = "aes-256-gcm";
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// 暗号化済みカラムに保存されるエンベロープ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedField {
    pub algorithm: String,
    /// Base64(暗号文 || 認証タグ)
    pub ciphertext: String,
    /// Base64(ノンス)
    pub iv: String,
    pub version: u8,
}

impl EncryptedField {
    /// カラム値がエンベロープであれば取り出す（JSON文字列・JSONオブジェクトの両方に対応）
    pub fn from_column(value: &Value) -> Option<Self> {
        match value {
            Value::String(raw) => serde_json::from_str(raw).ok(),
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    /// カラムに保存する文字列表現
    pub fn to_column_value(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// 暗号化ケイパビリティ
pub trait FieldCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> AppResult<EncryptedField>;
    fn decrypt(&self, field: &EncryptedField) -> AppResult<String>;
}

/// AES-256-GCM アダプタ
#[derive(Clone)]
pub struct AesGcmFieldCipher {
    key: Key<Aes256Gcm>,
}

impl AesGcmFieldCipher {
    pub fn new(key_bytes: &[u8]) -> AppResult<Self> {
        if key_bytes.len() != KEY_LEN {
            return Err(AppError::InternalServerError(format!(
                "Encryption key must be {} bytes, got {}",
                KEY_LEN,
                key_bytes.len()
            )));
        }
        Ok(Self {
            key: *Key::<Aes256Gcm>::from_slice(key_bytes),
        })
    }

    pub fn from_base64_key(encoded: &str) -> AppResult<Self> {
        let key_bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::InternalServerError(format!("Invalid encryption key: {}", e)))?;
        Self::new(&key_bytes)
    }

    /// 開発用のランダム鍵
    pub fn generate() -> Self {
        Self {
            key: Aes256Gcm::generate_key(&mut OsRng),
        }
    }
}

impl FieldCipher for AesGcmFieldCipher {
    fn encrypt(&self, plaintext: &str) -> AppResult<EncryptedField> {
        let cipher = Aes256Gcm::new(&self.key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| AppError::InternalServerError(format!("Encryption failed: {}", e)))?;

        Ok(EncryptedField {
            algorithm: AES_256_GCM.to_string(),
            ciphertext: general_purpose::STANDARD.encode(ciphertext),
            iv: general_purpose::STANDARD.encode(nonce),
            version: 1,
        })
    }

    fn decrypt(&self, field: &EncryptedField) -> AppResult<String> {
        if field.algorithm != AES_256_GCM {
            return Err(AppError::InternalServerError(format!(
                "Unsupported encryption algorithm: {}",
                field.algorithm
            )));
        }

        let nonce_bytes = general_purpose::STANDARD
            .decode(&field.iv)
            .map_err(|e| AppError::InternalServerError(format!("Invalid nonce encoding: {}", e)))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(AppError::InternalServerError(
                "Invalid nonce length".to_string(),
            ));
        }
        let ciphertext = general_purpose::STANDARD
            .decode(&field.ciphertext)
            .map_err(|e| {
                AppError::InternalServerError(format!("Invalid ciphertext encoding: {}", e))
            })?;

        let cipher = Aes256Gcm::new(&self.key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| AppError::InternalServerError(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::InternalServerError(format!("Decrypted field is not UTF-8: {}", e)))
    }
}
