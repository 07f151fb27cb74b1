// 🔎 Transaction Classifier - card number → vendor
// Looks up the leading digits of each card number in the vendor trie and drops
// transactions whose prefix is not recognised.

use crate::records::{ClassifiedTransaction, Transaction};
use crate::trie::{MatchPolicy, Trie};

/// Leading card-number digits passed to the trie. Matches the longest
/// pattern in the standard vendor table.
pub const DEFAULT_PREFIX_WINDOW: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Surviving transactions, in input order
    pub classified: Vec<ClassifiedTransaction>,
    /// Transactions dropped because no vendor matched
    pub unmatched: usize,
}

pub struct Classifier<'a> {
    trie: &'a Trie,
    prefix_window: usize,
    policy: MatchPolicy,
}

impl<'a> Classifier<'a> {
    pub fn new(trie: &'a Trie) -> Self {
        Classifier {
            trie,
            prefix_window: DEFAULT_PREFIX_WINDOW,
            policy: MatchPolicy::FirstMatch,
        }
    }

    pub fn with_prefix_window(mut self, prefix_window: usize) -> Self {
        self.prefix_window = prefix_window;
        self
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Vendor for a card number, derived from its leading `prefix_window` digits.
    pub fn vendor_for(&self, credit_card_number: u64) -> Option<&'a str> {
        let digits = credit_card_number.to_string();
        let window = &digits[..digits.len().min(self.prefix_window)];
        let trie: &'a Trie = self.trie;
        trie.lookup_with(window, self.policy)
    }

    /// Attach vendors; transactions without a vendor are filtered out.
    pub fn classify(&self, transactions: Vec<Transaction>) -> Classification {
        let total = transactions.len();

        let classified: Vec<ClassifiedTransaction> = transactions
            .into_iter()
            .filter_map(|tx| {
                let vendor = self.vendor_for(tx.credit_card_number)?;
                Some(ClassifiedTransaction {
                    credit_card_number: tx.credit_card_number,
                    ipv4: tx.ipv4,
                    state: tx.state,
                    vendor: vendor.to_string(),
                })
            })
            .collect();

        let unmatched = total - classified.len();
        if unmatched > 0 {
            tracing::debug!(unmatched, total, "dropped transactions with no vendor match");
        }

        Classification { classified, unmatched }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::VendorPrefixTable;
    use crate::trie::PrefixPattern;

    fn tx(card: u64) -> Transaction {
        Transaction::new(card, "10.0.0.1", "CA")
    }

    #[test]
    fn test_classify_attaches_vendor_and_drops_unmatched() {
        let trie = VendorPrefixTable::standard().build_trie();
        let classifier = Classifier::new(&trie);

        let result = classifier.classify(vec![
            tx(4111111111111111),
            tx(9999000011112222),
            tx(378282246310005),
            tx(5612000000000000),
            tx(6011000990139424),
        ]);

        assert_eq!(result.unmatched, 2);
        let vendors: Vec<&str> = result.classified.iter().map(|t| t.vendor.as_str()).collect();
        assert_eq!(vendors, vec!["visa", "amex", "discover"]);
        let cards: Vec<u64> = result.classified.iter().map(|t| t.credit_card_number).collect();
        assert_eq!(cards, vec![4111111111111111, 378282246310005, 6011000990139424]);
    }

    #[test]
    fn test_prefix_window_limits_lookup() {
        let trie = VendorPrefixTable::standard().build_trie();

        // "6011" needs four digits; a three-digit window only reaches "601"
        let narrow = Classifier::new(&trie).with_prefix_window(3);
        assert_eq!(narrow.vendor_for(6011000990139424), None);
        assert_eq!(narrow.vendor_for(6500000000000000), Some("discover"));

        let wide = Classifier::new(&trie);
        assert_eq!(wide.vendor_for(6011000990139424), Some("discover"));
    }

    #[test]
    fn test_short_card_number_uses_all_digits() {
        let trie = VendorPrefixTable::standard().build_trie();
        let classifier = Classifier::new(&trie);

        assert_eq!(classifier.vendor_for(4), Some("visa"));
        assert_eq!(classifier.vendor_for(213), None);
    }

    #[test]
    fn test_match_policy_changes_shadowed_vendor() {
        let mut trie = Trie::new();
        trie.insert(&PrefixPattern::parse("5").unwrap(), "mastercard");
        trie.insert(&PrefixPattern::parse("5018").unwrap(), "maestro");

        let first = Classifier::new(&trie);
        let longest = Classifier::new(&trie).with_policy(MatchPolicy::LongestMatch);

        assert_eq!(first.vendor_for(5018000000000000), Some("mastercard"));
        assert_eq!(longest.vendor_for(5018000000000000), Some("maestro"));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let trie = VendorPrefixTable::standard().build_trie();
        let classifier = Classifier::new(&trie);

        let first = classifier.classify(vec![tx(4111111111111111), tx(5105105105105100), tx(3530111333300000)]);
        let again = classifier.classify(
            first
                .classified
                .iter()
                .map(|t| Transaction::new(t.credit_card_number, t.ipv4.clone(), t.state.clone()))
                .collect(),
        );

        assert_eq!(first, again);
        for record in &first.classified {
            assert_eq!(classifier.vendor_for(record.credit_card_number), Some(record.vendor.as_str()));
        }
    }

    #[test]
    fn test_empty_input() {
        let trie = Trie::new();
        let result = Classifier::new(&trie).classify(Vec::new());
        assert!(result.classified.is_empty());
        assert_eq!(result.unmatched, 0);
    }
}
