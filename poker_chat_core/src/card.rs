use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
// --- 核心数据结构定义 ---

/// 花色 (Suit)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Hearts,   // 红心 ♥
    Diamonds, // 方块 ♦
    Clubs,    // 梅花 ♣
    Spades,   // 黑桃 ♠
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];
}

/// 点数 (Rank)
/// Ace 可以是最大也可以是最小 (在 A-2-3-4-5 顺子中)
/// Ord 的派生让 Ace 默认是最大的
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven,
        Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
    ];
}

/// 单张扑克牌 (Card)，创建后不可变
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }
}

/// 牌型等级 (HandRank)
/// 1. 变体的顺序从小到大排列，可以直接利用 `Ord` 进行比较。
/// 2. 变体内部存储了比较所需的所有信息（例如对子的大小、三条的大小、踢脚牌等）。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Serialize, Deserialize)]
pub enum HandRank {
    HighCard(Rank, Rank, Rank, Rank, Rank),          // 高牌
    OnePair(Rank, Rank, Rank, Rank),                 // 一对
    TwoPair(Rank, Rank, Rank),                       // 两对
    ThreeOfAKind(Rank, Rank, Rank),                  // 三条
    Straight(Rank),                                  // 顺子 (最高牌的点数)
    Flush(Rank, Rank, Rank, Rank, Rank),             // 同花
    FullHouse(Rank, Rank),                           // 葫芦 (三条的点数, 对子的点数)
    FourOfAKind(Rank, Rank),                         // 四条 (四条的点数, 踢脚牌)
    StraightFlush(Rank),                             // 同花顺 (最高牌的点数)
    RoyalFlush,                                      // 皇家同花顺
}

/// 数值化牌力的上界。`HandRank::value` 用它减去牌力，得到"越小越强"的数值。
const WEAKEST_VALUE: u32 = 16u32.pow(6);

impl HandRank {
    fn category(&self) -> u32 {
        match self {
            HandRank::HighCard(..) => 0,
            HandRank::OnePair(..) => 1,
            HandRank::TwoPair(..) => 2,
            HandRank::ThreeOfAKind(..) => 3,
            HandRank::Straight(..) => 4,
            HandRank::Flush(..) => 5,
            HandRank::FullHouse(..) => 6,
            HandRank::FourOfAKind(..) => 7,
            HandRank::StraightFlush(..) => 8,
            HandRank::RoyalFlush => 9,
        }
    }

    fn kickers(&self) -> Vec<Rank> {
        match *self {
            HandRank::HighCard(a, b, c, d, e) | HandRank::Flush(a, b, c, d, e) => vec![a, b, c, d, e],
            HandRank::OnePair(a, b, c, d) => vec![a, b, c, d],
            HandRank::TwoPair(a, b, c) | HandRank::ThreeOfAKind(a, b, c) => vec![a, b, c],
            HandRank::FullHouse(a, b) | HandRank::FourOfAKind(a, b) => vec![a, b],
            HandRank::Straight(a) | HandRank::StraightFlush(a) => vec![a],
            HandRank::RoyalFlush => vec![],
        }
    }

    /// 把牌型压缩成一个整数：数值越小牌越大，相同牌力得到相同数值。
    pub fn value(&self) -> u32 {
        encode_value(self.category(), &self.kickers())
    }
}

/// 类别占最高的 4 位，其后每 4 位一个踢脚牌 (点数+1，缺位补 0)
fn encode_value(category: u32, kickers: &[Rank]) -> u32 {
    let strength = (0..5).fold(category, |acc, i| {
        acc * 16 + kickers.get(i).map_or(0, |r| *r as u32 + 1)
    });
    WEAKEST_VALUE - strength
}

// --- 实现辅助功能 ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
            Suit::Spades => "♠",
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            HandRank::HighCard(..) => "高牌".to_string(),
            HandRank::OnePair(r1, ..) => format!("一对({})", r1),
            HandRank::TwoPair(r1, r2, ..) => format!("两对({},{})", r1, r2),
            HandRank::ThreeOfAKind(r1, ..) => format!("三条({})", r1),
            HandRank::Straight(..) => "顺子".to_string(),
            HandRank::Flush(..) => "同花".to_string(),
            HandRank::FullHouse(..) => "葫芦".to_string(),
            HandRank::FourOfAKind(..) => "四条".to_string(),
            HandRank::StraightFlush(..) => "同花顺".to_string(),
            HandRank::RoyalFlush => "皇家同花顺".to_string(),
        })
    }
}

/// 把一组牌格式化成 `[A♠ 10♥ 2♣]`
pub fn format_cards(cards: &[Card]) -> String {
    let parts: Vec<String> = cards.iter().map(|c| c.to_string()).collect();
    format!("[{}]", parts.join(" "))
}

// --- 牌力评估 ---

/// 牌力评估器：输入底牌加上已翻开的公共牌 (最多 7 张)，
/// 返回一个整数，数值越小牌越强，牌力相同则数值相同。
pub trait HandEvaluator {
    fn rank(&self, cards: &[Card]) -> u32;
}

/// 默认的评估器：5 张及以上枚举所有 5 张组合，不足 5 张只比较对子/三条/四条和高牌。
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardEvaluator;

impl HandEvaluator for StandardEvaluator {
    fn rank(&self, cards: &[Card]) -> u32 {
        match find_best_hand(cards) {
            Some(hand) => hand.value(),
            None => evaluate_partial_hand(cards),
        }
    }
}

/// 从 5 到 7 张牌中找出最优的 5 张牌组合牌力
/// 这是德州扑克规则的核心评估函数
///
/// 牌数少于 5 时返回 `None`。
pub fn find_best_hand(all_cards: &[Card]) -> Option<HandRank> {
    if all_cards.len() < 5 {
        return None;
    }

    // 通过生成所有5张牌的组合来找到最佳手牌。
    // 贪心算法（如移除最小的牌）可能会破坏顺子或同花。
    get_combinations(all_cards, 5)
        .into_iter()
        .map(|hand| evaluate_5_card_hand(&hand))
        .max() // HandRank 派生了 Ord，可以直接找到最大的
}

/// 按 (出现次数, 点数) 从大到小排列的点数统计
fn rank_groups(ranks: &[Rank]) -> Vec<(u8, Rank)> {
    let mut counts: HashMap<Rank, u8> = HashMap::new();
    for rank in ranks {
        *counts.entry(*rank).or_insert(0) += 1;
    }
    let mut sorted_counts: Vec<(u8, Rank)> = counts.into_iter().map(|(r, c)| (c, r)).collect();
    sorted_counts.sort_by(|a, b| b.cmp(a)); // 先按次数，再按点数从大到小排
    sorted_counts
}

/// 不足 5 张牌时 (例如翻牌前) 的牌力：只有点数组合，没有顺子和同花
fn evaluate_partial_hand(cards: &[Card]) -> u32 {
    let ranks: Vec<Rank> = cards.iter().map(|c| c.rank).collect();
    let groups = rank_groups(&ranks);
    let kickers: Vec<Rank> = groups.iter().map(|&(_, r)| r).collect();

    let category = match (groups.first().map(|g| g.0), groups.get(1).map(|g| g.0)) {
        (Some(4), _) => 7,
        (Some(3), _) => 3,
        (Some(2), Some(2)) => 2,
        (Some(2), _) => 1,
        _ => 0,
    };
    encode_value(category, &kickers)
}

/// 评估一手 5 张牌的牌型
fn evaluate_5_card_hand(hand: &[Card]) -> HandRank {
    debug_assert_eq!(hand.len(), 5, "评估的牌必须是5张");

    let flush = hand.iter().all(|c| c.suit == hand[0].suit);
    let groups = rank_groups(&hand.iter().map(|c| c.rank).collect::<Vec<_>>());
    // 按 (次数, 点数) 排好的点数，即比较时的踢脚牌顺序
    let r: Vec<Rank> = groups.iter().map(|&(_, rank)| rank).collect();
    let shape: Vec<u8> = groups.iter().map(|&(count, _)| count).collect();

    match shape.as_slice() {
        [4, 1] => HandRank::FourOfAKind(r[0], r[1]),
        [3, 2] => HandRank::FullHouse(r[0], r[1]),
        [3, 1, 1] => HandRank::ThreeOfAKind(r[0], r[1], r[2]),
        [2, 2, 1] => HandRank::TwoPair(r[0], r[1], r[2]),
        [2, 1, 1, 1] => HandRank::OnePair(r[0], r[1], r[2], r[3]),
        _ => match (straight_high(&r), flush) {
            (Some(Rank::Ace), true) => HandRank::RoyalFlush,
            (Some(high), true) => HandRank::StraightFlush(high),
            (None, true) => HandRank::Flush(r[0], r[1], r[2], r[3], r[4]),
            (Some(high), false) => HandRank::Straight(high),
            (None, false) => HandRank::HighCard(r[0], r[1], r[2], r[3], r[4]),
        },
    }
}

/// 5 张互不相同、从大到小排列的点数组成顺子时返回最大的那张。A-2-3-4-5 中 5 最大。
fn straight_high(ranks: &[Rank]) -> Option<Rank> {
    if ranks == [Rank::Ace, Rank::Five, Rank::Four, Rank::Three, Rank::Two] {
        return Some(Rank::Five);
    }
    let consecutive = ranks.windows(2).all(|w| w[0] as u8 == w[1] as u8 + 1);
    consecutive.then_some(ranks[0])
}

/// 按下标字典序列出从 `data` 中取 `k` 个元素的所有组合
fn get_combinations<T: Clone>(data: &[T], k: usize) -> Vec<Vec<T>> {
    let n = data.len();
    if k > n {
        return Vec::new();
    }

    let mut combos = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        combos.push(idx.iter().map(|&i| data[i].clone()).collect());
        // 找到最右边还能右移的下标
        let Some(pos) = (0..k).rev().find(|&i| idx[i] < n - k + i) else {
            return combos;
        };
        idx[pos] += 1;
        for i in pos + 1..k {
            idx[i] = idx[i - 1] + 1;
        }
    }
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use Rank::*;
    use Suit::*;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    // --- 5张牌评估测试 ---
    #[test]
    fn test_royal_flush() {
        let hand = [card(Ten, Spades), card(Ace, Spades), card(Queen, Spades), card(King, Spades), card(Jack, Spades)];
        assert_eq!(evaluate_5_card_hand(&hand), HandRank::RoyalFlush);
    }

    #[test]
    fn test_ace_low_straight_flush() {
        let hand = [card(Ace, Clubs), card(Two, Clubs), card(Three, Clubs), card(Four, Clubs), card(Five, Clubs)];
        assert_eq!(evaluate_5_card_hand(&hand), HandRank::StraightFlush(Five));
    }

    #[test]
    fn test_full_house() {
        let hand = [card(King, Spades), card(King, Hearts), card(King, Diamonds), card(Queen, Clubs), card(Queen, Spades)];
        assert_eq!(evaluate_5_card_hand(&hand), HandRank::FullHouse(King, Queen));
    }

    #[test]
    fn test_ace_low_straight() {
        let hand = [card(Ace, Spades), card(Two, Hearts), card(Three, Diamonds), card(Four, Clubs), card(Five, Spades)];
        assert_eq!(evaluate_5_card_hand(&hand), HandRank::Straight(Five));
    }

    #[test]
    fn test_two_pair() {
        let hand = [card(Jack, Spades), card(Jack, Hearts), card(Nine, Diamonds), card(Nine, Clubs), card(Ten, Spades)];
        assert_eq!(evaluate_5_card_hand(&hand), HandRank::TwoPair(Jack, Nine, Ten));
    }

    #[test]
    fn test_high_card() {
        let hand = [card(King, Spades), card(Queen, Hearts), card(Jack, Diamonds), card(Nine, Clubs), card(Seven, Spades)];
        assert_eq!(evaluate_5_card_hand(&hand), HandRank::HighCard(King, Queen, Jack, Nine, Seven));
    }

    // --- 7选5评估测试 ---

    #[test]
    fn test_best_hand_from_seven_is_flush() {
        let cards = [
            card(Ace, Hearts), card(King, Hearts),
            card(Ten, Hearts), card(Two, Hearts), card(Five, Hearts),
            card(Ace, Spades), card(Ten, Clubs),
        ];
        assert_eq!(find_best_hand(&cards), Some(HandRank::Flush(Ace, King, Ten, Five, Two)));
    }

    #[test]
    fn test_best_hand_from_seven_plays_the_board() {
        let cards = [
            card(Two, Spades), card(Two, Hearts),
            card(Ten, Clubs), card(Jack, Diamonds), card(Queen, Hearts),
            card(King, Spades), card(Ace, Clubs),
        ];
        assert_eq!(find_best_hand(&cards), Some(HandRank::Straight(Ace)));
    }

    #[test]
    fn test_pair_categories_use_grouped_kickers() {
        let quads = [card(Nine, Spades), card(Two, Hearts), card(Nine, Hearts), card(Nine, Diamonds), card(Nine, Clubs)];
        assert_eq!(evaluate_5_card_hand(&quads), HandRank::FourOfAKind(Nine, Two));
        let trips = [card(Four, Spades), card(Ace, Hearts), card(Four, Hearts), card(King, Diamonds), card(Four, Clubs)];
        assert_eq!(evaluate_5_card_hand(&trips), HandRank::ThreeOfAKind(Four, Ace, King));
        let pair = [card(Six, Spades), card(Ace, Hearts), card(Six, Hearts), card(Two, Diamonds), card(Ten, Clubs)];
        assert_eq!(evaluate_5_card_hand(&pair), HandRank::OnePair(Six, Ace, Ten, Two));
    }

    #[test]
    fn test_combinations_cover_every_choice_once() {
        let combos = get_combinations(&[1, 2, 3, 4, 5, 6, 7], 5);
        assert_eq!(combos.len(), 21);
        assert_eq!(combos.first(), Some(&vec![1, 2, 3, 4, 5]));
        assert_eq!(combos.last(), Some(&vec![3, 4, 5, 6, 7]));
        let mut unique = combos.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 21);
        assert_eq!(get_combinations(&[1, 2], 3), Vec::<Vec<i32>>::new());
    }

    #[test]
    fn test_best_hand_needs_five_cards() {
        assert_eq!(find_best_hand(&[card(Ace, Spades), card(Ace, Hearts)]), None);
    }

    // --- 数值牌力测试 ---

    #[test]
    fn test_value_is_lower_for_stronger_hands() {
        let ladder = [
            HandRank::RoyalFlush,
            HandRank::StraightFlush(King),
            HandRank::FourOfAKind(Ace, King),
            HandRank::FullHouse(King, Two),
            HandRank::FullHouse(Queen, Ace),
            HandRank::Flush(King, Jack, Ten, Five, Two),
            HandRank::Straight(Five),
            HandRank::ThreeOfAKind(Two, Four, Three),
            HandRank::TwoPair(Ace, King, Two),
            HandRank::OnePair(Ace, King, Queen, Three),
            HandRank::OnePair(Ace, King, Queen, Two),
            HandRank::HighCard(Ace, King, Queen, Jack, Nine),
        ];
        for pair in ladder.windows(2) {
            assert!(pair[0].value() < pair[1].value(), "{:?} 应强于 {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_evaluator_ties_on_board_play() {
        let board = [card(Ten, Clubs), card(Jack, Diamonds), card(Queen, Hearts), card(King, Spades), card(Ace, Clubs)];
        let mut first = vec![card(Two, Spades), card(Three, Hearts)];
        let mut second = vec![card(Four, Diamonds), card(Six, Clubs)];
        first.extend_from_slice(&board);
        second.extend_from_slice(&board);
        assert_eq!(StandardEvaluator.rank(&first), StandardEvaluator.rank(&second));
    }

    #[test]
    fn test_evaluator_partial_hands() {
        let pocket_aces = [card(Ace, Spades), card(Ace, Hearts)];
        let ace_king = [card(Ace, Clubs), card(King, Hearts)];
        let ace_queen = [card(Ace, Diamonds), card(Queen, Hearts)];
        let eval = StandardEvaluator;
        assert!(eval.rank(&pocket_aces) < eval.rank(&ace_king));
        assert!(eval.rank(&ace_king) < eval.rank(&ace_queen));
    }
}
