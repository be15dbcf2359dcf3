//! Variant merge rules.
//!
//! Pure functions over the variant → size → quantity tree. Callers validate
//! incoming variants/sizes against the catalog before merging; this module
//! only applies the structural rules:
//!
//! - "add to cart" accumulates quantities (`MergeMode::Additive`);
//! - "edit cart line" sets absolute quantities (`MergeMode::Overwrite`),
//!   where a non-positive quantity deletes the size and an explicit empty
//!   size list clears the whole variant;
//! - variants never survive with an empty size list. An empty result tells
//!   the caller to drop the cart item itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::{SizeQuantity, VariantQuantity};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    /// New quantity = old quantity + incoming quantity.
    Additive,
    /// New quantity = incoming quantity; non-positive removes the size.
    Overwrite,
}

/// One incoming `(variant, sizes)` entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantChange {
    pub variant_id: Uuid,
    pub sizes: Vec<SizeChange>,
}

/// Incoming quantities are signed: zero and negative express removal intent
/// on the overwrite path and are ignored on the additive path.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeChange {
    pub size_id: Uuid,
    pub quantity: i32,
}

impl VariantChange {
    /// Whether this entry would add anything new (at least one qty > 0).
    pub fn is_additive(&self) -> bool {
        self.sizes.iter().any(|s| s.quantity > 0)
    }
}

/// Apply `changes` to `existing`, in the order received, returning the new
/// tree. Does not mutate its inputs.
pub fn merge_variants(
    existing: &[VariantQuantity],
    changes: &[VariantChange],
    mode: MergeMode,
) -> Vec<VariantQuantity> {
    let mut merged = existing.to_vec();

    for change in changes {
        match merged.iter().position(|v| v.variant_id == change.variant_id) {
            Some(pos) => {
                if change.sizes.is_empty() {
                    // Explicit "clear this variant" signal.
                    merged.remove(pos);
                    continue;
                }
                for size in &change.sizes {
                    merge_size(&mut merged[pos].sizes, size, mode);
                }
                if merged[pos].sizes.is_empty() {
                    merged.remove(pos);
                }
            }
            None => {
                let sizes: Vec<SizeQuantity> = change
                    .sizes
                    .iter()
                    .filter(|s| s.quantity > 0)
                    .map(|s| SizeQuantity { size_id: s.size_id, quantity: s.quantity as u32 })
                    .collect();
                if !sizes.is_empty() {
                    merged.push(VariantQuantity::new(change.variant_id, sizes));
                }
            }
        }
    }

    merged.retain(|v| !v.sizes.is_empty());
    merged
}

fn merge_size(sizes: &mut Vec<SizeQuantity>, incoming: &SizeChange, mode: MergeMode) {
    if incoming.quantity <= 0 {
        match mode {
            MergeMode::Overwrite => sizes.retain(|s| s.size_id != incoming.size_id),
            MergeMode::Additive => {}
        }
        return;
    }
    let quantity = incoming.quantity as u32;
    match sizes.iter_mut().find(|s| s.size_id == incoming.size_id) {
        Some(existing) => {
            existing.quantity = match mode {
                MergeMode::Additive => existing.quantity.saturating_add(quantity),
                MergeMode::Overwrite => quantity,
            };
        }
        None => sizes.push(SizeQuantity { size_id: incoming.size_id, quantity }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(entries: &[(Uuid, &[(Uuid, u32)])]) -> Vec<VariantQuantity> {
        entries
            .iter()
            .map(|(variant_id, sizes)| {
                VariantQuantity::new(
                    *variant_id,
                    sizes
                        .iter()
                        .map(|(size_id, quantity)| SizeQuantity {
                            size_id: *size_id,
                            quantity: *quantity,
                        })
                        .collect(),
                )
            })
            .collect()
    }

    fn change(variant_id: Uuid, sizes: &[(Uuid, i32)]) -> VariantChange {
        VariantChange {
            variant_id,
            sizes: sizes
                .iter()
                .map(|(size_id, quantity)| SizeChange { size_id: *size_id, quantity: *quantity })
                .collect(),
        }
    }

    #[test]
    fn test_additive_accumulates_existing_size() {
        let (v, m) = (Uuid::new_v4(), Uuid::new_v4());
        let existing = tree(&[(v, &[(m, 2)])]);
        let merged = merge_variants(&existing, &[change(v, &[(m, 3)])], MergeMode::Additive);
        assert_eq!(merged[0].sizes[0].quantity, 5);
    }

    #[test]
    fn test_overwrite_sets_absolute_quantity() {
        let (v, m) = (Uuid::new_v4(), Uuid::new_v4());
        let existing = tree(&[(v, &[(m, 2)])]);
        let merged = merge_variants(&existing, &[change(v, &[(m, 3)])], MergeMode::Overwrite);
        assert_eq!(merged[0].sizes[0].quantity, 3);
        // Replaying the same absolute update is idempotent.
        let again = merge_variants(&merged, &[change(v, &[(m, 3)])], MergeMode::Overwrite);
        assert_eq!(again[0].sizes[0].quantity, 3);
    }

    #[test]
    fn test_overwrite_zero_removes_size() {
        let (v, m, l) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let existing = tree(&[(v, &[(m, 2), (l, 1)])]);
        let merged = merge_variants(&existing, &[change(v, &[(m, 0)])], MergeMode::Overwrite);
        assert_eq!(merged[0].sizes.len(), 1);
        assert_eq!(merged[0].sizes[0].size_id, l);
    }

    #[test]
    fn test_removing_last_size_removes_variant() {
        let (v, m) = (Uuid::new_v4(), Uuid::new_v4());
        let existing = tree(&[(v, &[(m, 2)])]);
        let merged = merge_variants(&existing, &[change(v, &[(m, 0)])], MergeMode::Overwrite);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_empty_size_list_clears_variant() {
        let (v, w, m) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let existing = tree(&[(v, &[(m, 2)]), (w, &[(m, 1)])]);
        let merged = merge_variants(&existing, &[change(v, &[])], MergeMode::Overwrite);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].variant_id, w);
    }

    #[test]
    fn test_new_variant_with_no_positive_sizes_is_noop() {
        let (v, m) = (Uuid::new_v4(), Uuid::new_v4());
        let merged = merge_variants(&[], &[change(v, &[(m, 0)])], MergeMode::Overwrite);
        assert!(merged.is_empty());
        let merged = merge_variants(&[], &[change(v, &[])], MergeMode::Additive);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_new_variant_keeps_only_positive_sizes() {
        let (v, m, l) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let merged =
            merge_variants(&[], &[change(v, &[(m, 2), (l, -1)])], MergeMode::Additive);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].sizes.len(), 1);
        assert_eq!(merged[0].sizes[0].quantity, 2);
    }

    #[test]
    fn test_overwrite_introduces_new_size_on_existing_variant() {
        let (v, m, l) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let existing = tree(&[(v, &[(m, 2)])]);
        let merged = merge_variants(&existing, &[change(v, &[(l, 4)])], MergeMode::Overwrite);
        assert_eq!(merged[0].sizes.len(), 2);
    }

    #[test]
    fn test_additive_saturates_instead_of_wrapping() {
        let (v, m) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tree = tree(&[(v, &[(m, 1)])]);
        for _ in 0..3 {
            tree = merge_variants(&tree, &[change(v, &[(m, i32::MAX)])], MergeMode::Additive);
        }
        assert_eq!(tree[0].sizes[0].quantity, u32::MAX);
    }

    #[test]
    fn test_change_entries_deserialize_from_camel_case() {
        let parsed: VariantChange = serde_json::from_value(serde_json::json!({
            "variantId": Uuid::new_v4(),
            "sizes": [{ "sizeId": Uuid::new_v4(), "quantity": 2 }],
        }))
        .unwrap();
        assert_eq!(parsed.sizes[0].quantity, 2);
    }

    #[test]
    fn test_entries_apply_in_order() {
        let (v, m) = (Uuid::new_v4(), Uuid::new_v4());
        let changes = [change(v, &[(m, 5)]), change(v, &[(m, 0)])];
        let merged = merge_variants(&[], &changes, MergeMode::Overwrite);
        assert!(merged.is_empty());
    }
}
