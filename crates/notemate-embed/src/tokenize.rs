use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use notemate_core::error::{Error, Result};

/// Encode one text as `[1, T]` id and mask tensors, truncated to `max_len` tokens.
pub fn tokenize_on_device(
    tokenizer: &Tokenizer,
    text: &str,
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer
        .encode(text, true)
        .map_err(|e| Error::Embedding(format!("tokenization failed: {e}")))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    if ids.len() > max_len {
        ids.truncate(max_len);
        mask.truncate(max_len);
    }
    let to_tensor = |values: &[u32]| -> candle_core::Result<Tensor> {
        Tensor::new(values, device)?.unsqueeze(0)
    };
    let input_ids = to_tensor(&ids).map_err(crate::embedding_error)?;
    let attention_mask = to_tensor(&mask).map_err(crate::embedding_error)?;
    Ok((input_ids, attention_mask))
}
