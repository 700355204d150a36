//! Partial masking action
//!
//! Masking convention (fixed, relied on by tests):
//! - Email-shaped values (exactly one `@`, non-empty local part and domain)
//!   keep the domain from `@` onward in the clear; the local part keeps the
//!   first `keep` characters and the remainder collapses to exactly three
//!   mask characters, hiding its length. `john@doe.com` with `keep: 2`
//!   becomes `jo***@doe.com`. A `keep` covering the whole local part masks
//!   all of it.
//! - All other values are masked per character outside the kept prefix
//!   (`keep`) and suffix (`keep_last`). `4111111111111111` with
//!   `keep_last: 4` becomes `************1111`.
//! - When `keep + keep_last` covers the whole value, every character is
//!   masked.

use crate::action::{leaf_text, ActionOutput, Capability, Params, ProtectAction};
use fieldveil_core::{FieldValue, Result};

const EMAIL_PAD: usize = 3;

/// Irreversible partial obfuscation of a value
#[derive(Debug, Default)]
pub struct MaskAction;

impl MaskAction {
    pub fn new() -> Self {
        Self
    }
}

impl ProtectAction for MaskAction {
    fn capability(&self) -> Capability {
        Capability::Irreversible
    }

    fn check_params(&self, params: &Params) -> Result<()> {
        params.usize_opt("keep")?;
        params.usize_opt("keep_last")?;
        params.char_opt("mask_char")?;
        Ok(())
    }

    fn transform(&self, value: &FieldValue, params: &Params) -> Result<ActionOutput> {
        let Some(text) = leaf_text(value)? else {
            return Ok(ActionOutput::null_passthrough());
        };

        let keep = params.usize_opt("keep")?.unwrap_or(0);
        let keep_last = params.usize_opt("keep_last")?.unwrap_or(0);
        let mask_char = params.char_opt("mask_char")?.unwrap_or('*');

        let (masked, hidden) = match split_email(&text) {
            Some((local, domain)) => mask_email(local, domain, keep, mask_char),
            None => mask_span(&text, keep, keep_last, mask_char),
        };

        Ok(ActionOutput::new(masked).with_summary(format!("masked {hidden} chars")))
    }
}

/// Split `local@domain`, accepting only unambiguous email shapes
fn split_email(text: &str) -> Option<(&str, &str)> {
    let (local, domain) = text.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some((local, domain))
}

fn mask_email(local: &str, domain: &str, keep: usize, mask_char: char) -> (String, usize) {
    let local_len = local.chars().count();
    // A kept prefix covering the whole local part would leak it; mask all
    // of it, matching the non-email branch.
    let keep = if keep >= local_len { 0 } else { keep };
    let kept: String = local.chars().take(keep).collect();
    let pad: String = std::iter::repeat(mask_char).take(EMAIL_PAD).collect();
    (format!("{kept}{pad}@{domain}"), local_len - keep)
}

fn mask_span(text: &str, keep: usize, keep_last: usize, mask_char: char) -> (String, usize) {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    // A kept prefix/suffix covering the whole value would leak it; mask all.
    if keep + keep_last >= len {
        return (std::iter::repeat(mask_char).take(len).collect(), len);
    }

    let mut out = String::with_capacity(len);
    for (i, c) in chars.iter().enumerate() {
        if i < keep || i >= len - keep_last {
            out.push(*c);
        } else {
            out.push(mask_char);
        }
    }
    (out, len - keep - keep_last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(value: &str, params: Params) -> String {
        let output = MaskAction::new()
            .transform(&FieldValue::from(value), &params)
            .unwrap();
        match output.value {
            FieldValue::String(s) => s,
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn email_keeps_domain_and_hides_local_length() {
        assert_eq!(
            mask("john@doe.com", Params::new().with("keep", 2)),
            "jo***@doe.com"
        );
        assert_eq!(mask("j@doe.com", Params::new()), "***@doe.com");
    }

    #[test]
    fn keep_covering_the_local_part_masks_it_entirely() {
        assert_eq!(
            mask("jo@doe.com", Params::new().with("keep", 2)),
            "***@doe.com"
        );
        assert_eq!(
            mask("john@doe.com", Params::new().with("keep", 10)),
            "***@doe.com"
        );
    }

    #[test]
    fn card_number_keeps_last_four() {
        assert_eq!(
            mask("4111111111111111", Params::new().with("keep_last", 4)),
            "************1111"
        );
    }

    #[test]
    fn excessive_keep_masks_everything() {
        assert_eq!(
            mask("abc", Params::new().with("keep", 2).with("keep_last", 2)),
            "***"
        );
    }

    #[test]
    fn custom_mask_char() {
        assert_eq!(
            mask(
                "123456789",
                Params::new().with("keep", 3).with("mask_char", "#")
            ),
            "123######"
        );
    }

    #[test]
    fn masked_output_never_contains_hidden_span() {
        let input = "4111111111111111";
        let out = mask(input, Params::new().with("keep_last", 4));
        assert!(!out.contains(input));
        assert!(out.ends_with("1111"));
    }

    #[test]
    fn numbers_mask_through_text_form() {
        let output = MaskAction::new()
            .transform(&FieldValue::Int(123456), &Params::new().with("keep_last", 2))
            .unwrap();
        assert_eq!(output.value, FieldValue::from("****56"));
    }

    #[test]
    fn null_passes_through() {
        let output = MaskAction::new()
            .transform(&FieldValue::Null, &Params::new())
            .unwrap();
        assert_eq!(output.value, FieldValue::Null);
    }

    #[test]
    fn param_schema_rejects_bad_types() {
        assert!(MaskAction::new()
            .check_params(&Params::new().with("keep", "lots"))
            .is_err());
        assert!(MaskAction::new()
            .check_params(&Params::new().with("mask_char", "**"))
            .is_err());
    }
}
