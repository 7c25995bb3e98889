use crate::card::{Card, Rank, Suit};
use crate::error::{TableError, TableResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// 牌堆。`cards` 的末尾是牌顶：底牌、翻牌、转牌、河牌都从牌顶依次抽取。
///
/// 洗牌使用以当前时间为种子的非加密随机数，只适合娱乐局，
/// 涉及真实资金时需要换成加密安全的洗牌并保留审计记录。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// 按 红心、方块、梅花、黑桃 的顺序生成 52 张牌，未洗牌
    pub fn standard() -> Deck {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }
        Deck { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// 清空牌堆，下一次洗牌时会重新生成整副牌
    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// 洗牌：牌堆为空时先补满 52 张，再用时间种子打乱
    pub fn shuffle(&mut self) {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        self.shuffle_with(&mut StdRng::seed_from_u64(seed));
    }

    /// 用给定的随机源洗牌，测试里用固定种子复现牌序
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.cards.is_empty() {
            *self = Deck::standard();
        }
        self.cards.shuffle(rng);
    }

    /// 从牌顶抽一张牌
    pub fn draw(&mut self) -> TableResult<Card> {
        self.cards.pop().ok_or(TableError::EmptyDeck)
    }

    /// 从牌顶连续抽 n 张。牌不够时一张都不抽，直接返回错误。
    pub fn draw_n(&mut self, n: usize) -> TableResult<Vec<Card>> {
        if self.cards.len() < n {
            return Err(TableError::EmptyDeck);
        }
        let split = self.cards.len() - n;
        let mut taken = self.cards.split_off(split);
        taken.reverse();
        Ok(taken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shuffle_fills_empty_deck_with_unique_cards() {
        for seed in 0..50 {
            let mut deck = Deck::default();
            deck.shuffle_with(&mut StdRng::seed_from_u64(seed));
            let unique: HashSet<Card> = deck.cards().iter().copied().collect();
            assert_eq!(deck.len(), 52);
            assert_eq!(unique.len(), 52);
        }
    }

    #[test]
    fn test_time_seeded_shuffle_keeps_all_cards() {
        let mut deck = Deck::default();
        deck.shuffle();
        let unique: HashSet<Card> = deck.cards().iter().copied().collect();
        assert_eq!(unique.len(), 52);
    }

    #[test]
    fn test_shuffle_does_not_refill_partial_deck() {
        let mut deck = Deck::standard();
        deck.draw_n(10).unwrap();
        deck.shuffle_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(deck.len(), 42);
    }

    #[test]
    fn test_draw_never_repeats_and_fails_when_exhausted() {
        let mut deck = Deck::default();
        deck.shuffle_with(&mut StdRng::seed_from_u64(42));
        let mut seen = HashSet::new();
        for _ in 0..52 {
            let card = deck.draw().unwrap();
            assert!(seen.insert(card), "{} 被抽出了两次", card);
        }
        assert_eq!(deck.draw(), Err(TableError::EmptyDeck));
    }

    #[test]
    fn test_draw_n_takes_from_the_top_in_order() {
        let mut deck = Deck::standard();
        let top: Vec<Card> = deck.cards().iter().rev().take(3).copied().collect();
        assert_eq!(deck.draw_n(3).unwrap(), top);
        assert_eq!(deck.len(), 49);
    }

    #[test]
    fn test_draw_n_is_all_or_nothing() {
        let mut deck = Deck::standard();
        deck.draw_n(50).unwrap();
        assert_eq!(deck.draw_n(3), Err(TableError::EmptyDeck));
        assert_eq!(deck.len(), 2);
    }
}
