// ============================================================
// Layer 6 - Tokenizer Store
// ============================================================
// Resolves the `--model` option to a HuggingFace tokenizer.json
// and wraps the loaded tokenizer as a TextTokenizer.
//
//   --model path/to/tokenizer.json   → loaded directly
//   --model path/to/model_dir        → model_dir/tokenizer.json
//
// The wrapped tokenizer is never mutated. Each encode call clones
// it and applies that call's truncation and padding settings, so
// one HfTokenizer can be shared across preprocessing workers.
//
// Reference: tokenizers crate documentation

use anyhow::{anyhow, bail, Result};
use std::path::{Path, PathBuf};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::domain::record::{EncodedText, PaddingMode};
use crate::domain::traits::TextTokenizer;

pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    /// Resolve a model identifier to a tokenizer file.
    pub fn resolve(model: &str) -> Result<Self> {
        let candidate = Path::new(model);
        let path = if candidate.is_dir() {
            candidate.join("tokenizer.json")
        } else {
            candidate.to_path_buf()
        };

        if !path.is_file() {
            bail!(
                "No tokenizer.json found for model '{}' (looked at '{}')",
                model,
                path.display()
            );
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<HfTokenizer> {
        let inner = Tokenizer::from_file(&self.path).map_err(|e| {
            anyhow!("Cannot load tokenizer from '{}': {}", self.path.display(), e)
        })?;
        tracing::info!(
            "Loaded tokenizer from '{}' (vocab size {})",
            self.path.display(),
            inner.get_vocab_size(true)
        );
        Ok(HfTokenizer::new(inner))
    }
}

// ─── HfTokenizer ─────────────────────────────────────────────────────────────
pub struct HfTokenizer {
    inner:     Tokenizer,
    pad_id:    u32,
    pad_token: String,
}

impl HfTokenizer {
    pub fn new(inner: Tokenizer) -> Self {
        let (pad_id, pad_token) = match inner.get_padding() {
            Some(p) => (p.pad_id, p.pad_token.clone()),
            None => ["<pad>", "[PAD]", "<|pad|>"]
                .iter()
                .find_map(|t| inner.token_to_id(t).map(|id| (id, t.to_string())))
                .unwrap_or((0, "<pad>".to_string())),
        };
        Self { inner, pad_id, pad_token }
    }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

impl TextTokenizer for HfTokenizer {
    fn encode_batch(
        &self,
        texts:      &[String],
        max_length: usize,
        padding:    PaddingMode,
    ) -> Result<Vec<EncodedText>> {
        let mut tok = self.inner.clone();
        tok.with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| anyhow!("Invalid truncation settings: {e}"))?;

        match padding {
            PaddingMode::DoNotPad => {
                tok.with_padding(None);
            }
            PaddingMode::MaxLength => {
                tok.with_padding(Some(PaddingParams {
                    strategy:  PaddingStrategy::Fixed(max_length),
                    pad_id:    self.pad_id,
                    pad_token: self.pad_token.clone(),
                    ..Default::default()
                }));
            }
        }

        let encodings = tok
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;

        Ok(encodings
            .into_iter()
            .map(|e| EncodedText {
                ids:            e.get_ids().to_vec(),
                attention_mask: e.get_attention_mask().to_vec(),
            })
            .collect())
    }

    fn decode_batch(&self, ids: &[Vec<u32>], skip_special_tokens: bool) -> Result<Vec<String>> {
        let vocab = self.vocab_size();
        if let Some(bad) = ids.iter().flatten().find(|&&id| id as usize >= vocab) {
            bail!("Token id {} is outside the vocabulary range (size {})", bad, vocab);
        }

        let seqs: Vec<&[u32]> = ids.iter().map(Vec::as_slice).collect();
        self.inner
            .decode_batch(&seqs, skip_special_tokens)
            .map_err(|e| anyhow!("Decoding error: {e}"))
    }

    fn pad_token_id(&self) -> u32 {
        self.pad_id
    }
}
