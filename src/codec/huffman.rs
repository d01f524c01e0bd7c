//! Frequency-driven prefix coding over RLE pair symbols.
//!
//! One dictionary is built per frame from the global pair population of
//! all macroblocks. Tree construction always merges the two lowest-
//! frequency nodes, with ties broken by first-seen order so the tree
//! shape (and therefore every code length) is deterministic.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::codec::rle::{RlePair, PAIR_RECORD_LEN};
use crate::error::{CodecError, CodecResult};

/// Entropy-coding alphabet key derived from an [`RlePair`].
///
/// The float value is keyed by its raw bits, which makes the mapping
/// lossless and the symbol hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub run: u32,
    pub value_bits: u64,
}

impl Symbol {
    pub fn from_pair(pair: &RlePair) -> Self {
        Self {
            run: pair.run,
            value_bits: pair.value.to_bits(),
        }
    }

    pub fn to_pair(self) -> RlePair {
        RlePair::new(self.run, f64::from_bits(self.value_bits))
    }

    /// Wire key for the dictionary table: the pair's 12-byte record.
    pub fn key_bytes(self) -> [u8; PAIR_RECORD_LEN] {
        self.to_pair().to_bytes()
    }

    pub fn from_key_bytes(bytes: &[u8]) -> CodecResult<Self> {
        Ok(Self::from_pair(&RlePair::from_bytes(bytes)?))
    }
}

/// Root-to-leaf bit path; `bits` holds the path MSB-first within `len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    pub bits: u64,
    pub len: u8,
}

impl Code {
    pub const EMPTY: Code = Code { bits: 0, len: 0 };
}

/// Huffman tree node; leaves hold exactly one symbol.
#[derive(Debug)]
struct TreeNode {
    symbol: Option<Symbol>,
    left: Option<Box<TreeNode>>,
    right: Option<Box<TreeNode>>,
}

impl TreeNode {
    fn leaf(symbol: Symbol) -> Self {
        Self {
            symbol: Some(symbol),
            left: None,
            right: None,
        }
    }

    fn internal(left: TreeNode, right: TreeNode) -> Self {
        Self {
            symbol: None,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }
}

/// Min-heap entry ordered by (frequency, insertion sequence).
struct HeapEntry {
    freq: u64,
    seq: u64,
    node: TreeNode,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.freq == other.freq && self.seq == other.seq
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so the BinaryHeap pops the global minimum
        (other.freq, other.seq).cmp(&(self.freq, self.seq))
    }
}

/// Symbol -> code table, iterable in deterministic (first-seen) order.
#[derive(Debug, Clone, Default)]
pub struct EncodingDictionary {
    entries: Vec<(Symbol, Code)>,
    by_symbol: HashMap<Symbol, Code>,
}

impl EncodingDictionary {
    /// Builds the dictionary from the frame-wide pair population.
    pub fn build(pairs: &[RlePair]) -> Self {
        let mut frequencies: Vec<(Symbol, u64)> = Vec::new();
        let mut seen: HashMap<Symbol, usize> = HashMap::new();
        for pair in pairs {
            let symbol = Symbol::from_pair(pair);
            match seen.get(&symbol) {
                Some(&idx) => frequencies[idx].1 += 1,
                None => {
                    seen.insert(symbol, frequencies.len());
                    frequencies.push((symbol, 1));
                }
            }
        }

        if frequencies.is_empty() {
            return Self::default();
        }

        let mut heap = BinaryHeap::with_capacity(frequencies.len());
        let mut seq = 0u64;
        for &(symbol, freq) in &frequencies {
            heap.push(HeapEntry {
                freq,
                seq,
                node: TreeNode::leaf(symbol),
            });
            seq += 1;
        }

        while heap.len() > 1 {
            let a = heap.pop().expect("heap has at least two entries");
            let b = heap.pop().expect("heap has at least two entries");
            heap.push(HeapEntry {
                freq: a.freq + b.freq,
                seq,
                node: TreeNode::internal(a.node, b.node),
            });
            seq += 1;
        }

        let root = heap.pop().expect("heap holds the root").node;
        let mut codes: HashMap<Symbol, Code> = HashMap::new();
        assign_codes(&root, Code::EMPTY, &mut codes);

        // report codes in first-seen symbol order
        let entries: Vec<(Symbol, Code)> = frequencies
            .iter()
            .map(|&(symbol, _)| (symbol, codes[&symbol]))
            .collect();
        Self::from_entries(entries)
    }

    /// Rebuilds a dictionary from deserialized wire entries.
    pub fn from_entries(entries: Vec<(Symbol, Code)>) -> Self {
        let by_symbol = entries.iter().copied().collect();
        Self { entries, by_symbol }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Code> {
        self.by_symbol.get(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Symbol, Code)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Depth-first traversal: "0" on left edges, "1" on right edges. A
/// single-node tree maps its lone symbol to the empty code.
fn assign_codes(node: &TreeNode, code: Code, codes: &mut HashMap<Symbol, Code>) {
    if let Some(symbol) = node.symbol {
        codes.insert(symbol, code);
        return;
    }
    if let Some(ref left) = node.left {
        assign_codes(
            left,
            Code {
                bits: code.bits << 1,
                len: code.len + 1,
            },
            codes,
        );
    }
    if let Some(ref right) = node.right {
        assign_codes(
            right,
            Code {
                bits: (code.bits << 1) | 1,
                len: code.len + 1,
            },
            codes,
        );
    }
}

/// Concatenated variable-length codes, MSB-first within each byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitString {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_code(&mut self, code: &Code) {
        for i in (0..code.len).rev() {
            self.push_bit((code.bits >> i) & 1 == 1);
        }
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn bit(&self, index: usize) -> bool {
        (self.bytes[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Replaces each pair's symbol with its code and concatenates the bits.
pub fn encode_pairs(pairs: &[RlePair], dict: &EncodingDictionary) -> CodecResult<BitString> {
    let mut bits = BitString::new();
    for pair in pairs {
        let symbol = Symbol::from_pair(pair);
        let code = dict.get(&symbol).ok_or_else(|| {
            CodecError::Input(format!("no code for symbol ({}, {})", pair.run, pair.value))
        })?;
        bits.push_code(code);
    }
    Ok(bits)
}

/// Matches accumulated bits against the dictionary until `count` pairs
/// are recovered. Codes are prefix-free by construction, so the first
/// match is the only one. A single-symbol dictionary assigns the empty
/// code and contributes zero bits per pair, hence the explicit count.
pub fn decode_pairs(
    bits: &BitString,
    count: usize,
    dict: &EncodingDictionary,
) -> CodecResult<Vec<RlePair>> {
    if dict.is_empty() {
        if count == 0 {
            return Ok(Vec::new());
        }
        return Err(CodecError::Protocol(
            "cannot decode pairs with an empty dictionary".into(),
        ));
    }

    // zero-bit codes: every pair is the dictionary's only symbol
    if dict.len() == 1 {
        let symbol = dict.iter().next().expect("single entry").0;
        return Ok(vec![symbol.to_pair(); count]);
    }

    let by_code: HashMap<(u64, u8), Symbol> = dict
        .iter()
        .map(|&(symbol, code)| ((code.bits, code.len), symbol))
        .collect();

    let mut pairs = Vec::with_capacity(count);
    let mut acc = 0u64;
    let mut acc_len = 0u8;
    let mut pos = 0usize;
    while pairs.len() < count {
        if pos >= bits.bit_len() {
            return Err(CodecError::Protocol(format!(
                "bitstream exhausted after {} of {} pairs",
                pairs.len(),
                count
            )));
        }
        if acc_len == 64 {
            return Err(CodecError::Protocol(
                "no code matches the accumulated bits".into(),
            ));
        }
        acc = (acc << 1) | bits.bit(pos) as u64;
        acc_len += 1;
        pos += 1;
        if let Some(symbol) = by_code.get(&(acc, acc_len)) {
            pairs.push(symbol.to_pair());
            acc = 0;
            acc_len = 0;
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs_of(values: &[(u32, f64)]) -> Vec<RlePair> {
        values.iter().map(|&(r, v)| RlePair::new(r, v)).collect()
    }

    #[test]
    fn single_symbol_gets_empty_code() {
        let pairs = pairs_of(&[(2, 7.0), (2, 7.0), (2, 7.0)]);
        let dict = EncodingDictionary::build(&pairs);
        assert_eq!(dict.len(), 1);
        let (_, code) = dict.iter().next().unwrap();
        assert_eq!(code.len, 0);

        let bits = encode_pairs(&pairs, &dict).unwrap();
        assert_eq!(bits.bit_len(), 0);
        let decoded = decode_pairs(&bits, 3, &dict).unwrap();
        assert_eq!(decoded, pairs);
    }

    #[test]
    fn codes_are_prefix_free() {
        let mut pairs = Vec::new();
        for k in 0..12u32 {
            for _ in 0..=k * k {
                pairs.push(RlePair::new(k, k as f64 + 0.5));
            }
        }
        let dict = EncodingDictionary::build(&pairs);
        assert_eq!(dict.len(), 12);

        let codes: Vec<Code> = dict.iter().map(|&(_, c)| c).collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i == j {
                    continue;
                }
                if a.len <= b.len {
                    let prefix = b.bits >> (b.len - a.len);
                    assert!(
                        prefix != a.bits,
                        "code {:0width$b} is a prefix of {:0w2$b}",
                        a.bits,
                        b.bits,
                        width = a.len as usize,
                        w2 = b.len as usize
                    );
                }
            }
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let pairs = pairs_of(&[
            (0, 5.0),
            (3, -1.0),
            (0, 5.0),
            (7, 2.5),
            (0, 5.0),
            (3, -1.0),
            (12, 0.0),
        ]);
        let dict = EncodingDictionary::build(&pairs);
        let bits = encode_pairs(&pairs, &dict).unwrap();
        let decoded = decode_pairs(&bits, pairs.len(), &dict).unwrap();
        assert_eq!(decoded, pairs);
    }

    #[test]
    fn tie_break_is_stable() {
        // all symbols equally frequent: rebuilt dictionaries must agree
        let pairs = pairs_of(&[(0, 1.0), (1, 2.0), (2, 3.0), (3, 4.0)]);
        let a = EncodingDictionary::build(&pairs);
        let b = EncodingDictionary::build(&pairs);
        let ea: Vec<_> = a.iter().collect();
        let eb: Vec<_> = b.iter().collect();
        assert_eq!(ea, eb);
        // with four equal-frequency symbols every code is two bits
        assert!(a.iter().all(|&(_, c)| c.len == 2));
    }

    #[test]
    fn frequent_symbols_get_shorter_codes() {
        let mut pairs = vec![RlePair::new(1, 9.0); 40];
        pairs.extend(pairs_of(&[(2, 8.0), (3, 7.0), (4, 6.0)]));
        let dict = EncodingDictionary::build(&pairs);
        let frequent = dict.get(&Symbol::from_pair(&RlePair::new(1, 9.0))).unwrap();
        let rare = dict.get(&Symbol::from_pair(&RlePair::new(4, 6.0))).unwrap();
        assert!(frequent.len < rare.len);
    }

    #[test]
    fn symbol_key_bytes_round_trip() {
        let symbol = Symbol::from_pair(&RlePair::new(5, -0.125));
        let back = Symbol::from_key_bytes(&symbol.key_bytes()).unwrap();
        assert_eq!(back, symbol);
    }
}
