//! The linkage search.
//!
//! Words sit in slots `1..=n`, with an empty virtual slot on each side (`0` and
//! `n + 1`). A subproblem is a span of slots `(lw, rw)`, exclusive on both ends, plus
//! the connector each end still has to satisfy inside the span (`le` pointing right
//! out of `lw`, `re` pointing left out of `rw`) and the null cost the span must use
//! up. Splitting on the word `w` that `le` links to (or `re`, when there is no `le`)
//! gives the classic link grammar recurrence; planarity falls out of the split.
//!
//! Every memo entry keeps the exact number of completions (saturating) and the
//! cheapest `linkage_limit` of them as indices into a derivation arena, so the best
//! linkages can be read back without enumerating all of them.

use std::collections::HashMap;
use std::mem::size_of;
use std::ops::Add;

use tracing::{debug, trace, warn};

use crate::connector::{matches, Connector};
use crate::disjunct::{Disjunct, DisjunctSet};
use crate::governor::ResourceGovernor;
use crate::options::{ParseOptions, Resources};
use crate::utils::null_tiers;

/// Index type for the derivation arena
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct DerivIdx(u32);

/// The derivation with no links and no chosen disjuncts
const EMPTY: DerivIdx = DerivIdx(0);

/// Index type for computed tables
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct TableIdx(u32);

const ZERO: TableIdx = TableIdx(0);
const ONE: TableIdx = TableIdx(1);

/// A connector on a word, as an offset into one of its disjunct's lists
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct ConnPos {
  disjunct: u32,
  offset: u16,
}

impl ConnPos {
  fn first(disjunct: usize, list: &[Connector]) -> Option<Self> {
    if list.is_empty() {
      None
    } else {
      Some(Self {
        disjunct: disjunct as u32,
        offset: 0,
      })
    }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct Key {
  lw: u32,
  rw: u32,
  le: Option<ConnPos>,
  re: Option<ConnPos>,
  nulls: u32,
}

/// What the search orders completions by: disjunct cost, then total link length
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
struct PartialCost {
  disjunct: u32,
  length: u32,
}

impl Add for PartialCost {
  type Output = Self;

  fn add(self, other: Self) -> Self {
    Self {
      disjunct: self.disjunct.saturating_add(other.disjunct),
      length: self.length.saturating_add(other.length),
    }
  }
}

#[derive(Debug, Copy, Clone)]
struct RawLink {
  lw: u32,
  rw: u32,
  lc: ConnPos,
  rc: ConnPos,
}

impl RawLink {
  fn length(&self) -> u32 {
    self.rw - self.lw
  }
}

/// One node of a derivation: the links and disjunct chosen at a split, and the
/// derivations of the two halves
#[derive(Debug, Clone)]
struct Step {
  links: [Option<RawLink>; 2],
  chosen: Option<(u32, u32)>,
  left: DerivIdx,
  right: DerivIdx,
  cost: PartialCost,
}

impl Step {
  fn empty() -> Self {
    Self {
      links: [None, None],
      chosen: None,
      left: EMPTY,
      right: EMPTY,
      cost: PartialCost::default(),
    }
  }
}

#[derive(Debug, Clone, Default)]
struct Table {
  count: u64,
  /// Cheapest first
  best: Vec<DerivIdx>,
}

impl Table {
  fn bytes(&self) -> usize {
    size_of::<Self>() + self.best.len() * size_of::<DerivIdx>()
  }
}

/// Collects completions for one subproblem, keeping only the cheapest `limit`
struct Accumulator {
  limit: usize,
  count: u64,
  pending: Vec<Step>,
}

impl Accumulator {
  fn new(limit: usize) -> Self {
    Self {
      limit,
      count: 0,
      pending: Vec::new(),
    }
  }

  /// Adds every pairing of a left and a right completion. Only pairs that could
  /// still be among the cheapest `limit` are materialized.
  fn combine(
    &mut self,
    steps: &[Step],
    left: &Table,
    right: &Table,
    links: [Option<RawLink>; 2],
    chosen: Option<(u32, u32)>,
    own: PartialCost,
  ) {
    self.count = self
      .count
      .saturating_add(left.count.saturating_mul(right.count));

    for (i, &l) in left.best.iter().enumerate() {
      for (j, &r) in right.best.iter().enumerate() {
        if (i + 1) * (j + 1) > self.limit {
          break;
        }
        self.pending.push(Step {
          links,
          chosen,
          left: l,
          right: r,
          cost: steps[l.0 as usize].cost + steps[r.0 as usize].cost + own,
        });
      }
    }

    if self.pending.len() >= 2 * self.limit {
      self.compact();
    }
  }

  fn compact(&mut self) {
    self.pending.sort_by_key(|s| s.cost);
    self.pending.truncate(self.limit);
  }

  fn finish(mut self, steps: &mut Vec<Step>) -> Table {
    self.compact();
    let best = self
      .pending
      .into_iter()
      .map(|step| {
        steps.push(step);
        DerivIdx((steps.len() - 1) as u32)
      })
      .collect();
    Table {
      count: self.count,
      best,
    }
  }
}

/// A word pairing in a finished candidate. Word indices count the walls.
#[derive(Debug, Clone, Copy)]
pub struct Pairing<'a> {
  pub lword: usize,
  pub rword: usize,
  /// The connector the left word emitted rightward
  pub left: &'a Connector,
  pub right: &'a Connector,
}

/// One linkage read back out of the search
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
  /// The disjunct each word used, `None` for null words
  pub chosen: Vec<Option<&'a Disjunct>>,
  pub null: Vec<bool>,
  /// Sorted by left word, then by right word descending
  pub links: Vec<Pairing<'a>>,
}

impl Candidate<'_> {
  pub fn disjunct_cost(&self) -> u32 {
    self.chosen.iter().flatten().map(|d| d.cost).sum()
  }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResult<'a> {
  /// The null count the candidates were found at, 0 when nothing was found
  pub null_count: usize,
  /// How many linkages exist at `null_count`, saturating
  pub found: u64,
  /// The cheapest of them, at most `linkage_limit`
  pub candidates: Vec<Candidate<'a>>,
  pub resources: Resources,
  /// The result came from the all-short retry after running out of resources
  pub panicked: bool,
}

pub struct LinkageSearch<'a> {
  /// Per slot, the disjuncts under the cost ceiling. Virtual slots are empty.
  disjuncts: Vec<Vec<&'a Disjunct>>,
  governor: ResourceGovernor,
  memo: HashMap<Key, TableIdx>,
  tables: Vec<Table>,
  steps: Vec<Step>,
  limit: usize,
  null_block: usize,
  islands_ok: bool,
  short_length: usize,
  all_short: bool,
  verbosity: u8,
  bytes: usize,
}

impl<'a> LinkageSearch<'a> {
  pub fn new(words: &[&'a DisjunctSet], opts: &ParseOptions, all_short: bool) -> Self {
    let mut disjuncts = Vec::with_capacity(words.len() + 2);
    disjuncts.push(Vec::new());
    for &set in words {
      disjuncts.push(
        set
          .iter()
          .filter(|d| d.cost <= opts.disjunct_cost)
          .collect(),
      );
    }
    disjuncts.push(Vec::new());

    let tables = vec![
      Table::default(),
      Table {
        count: 1,
        best: vec![EMPTY],
      },
    ];
    let steps = vec![Step::empty()];
    let bytes = tables.iter().map(Table::bytes).sum::<usize>() + size_of::<Step>();

    Self {
      disjuncts,
      governor: ResourceGovernor::from_options(opts),
      memo: HashMap::new(),
      tables,
      steps,
      limit: opts.linkage_limit.max(1),
      null_block: opts.null_block,
      islands_ok: opts.islands_ok,
      short_length: opts.short_length,
      all_short: all_short || opts.all_short_connectors,
      verbosity: opts.verbosity,
      bytes,
    }
  }

  /// Bytes held by the memo, the tables, and the derivation arena
  pub fn memory_in_use(&self) -> usize {
    self.bytes
  }

  fn num_words(&self) -> usize {
    self.disjuncts.len() - 2
  }

  fn disjunct(&self, slot: u32, pos: ConnPos) -> &'a Disjunct {
    self.disjuncts[slot as usize][pos.disjunct as usize]
  }

  fn right_conn(&self, slot: u32, pos: ConnPos) -> &'a Connector {
    &self.disjunct(slot, pos).right[pos.offset as usize]
  }

  fn left_conn(&self, slot: u32, pos: ConnPos) -> &'a Connector {
    &self.disjunct(slot, pos).left[pos.offset as usize]
  }

  fn next_right(&self, slot: u32, pos: ConnPos) -> Option<ConnPos> {
    let next = pos.offset + 1;
    if (next as usize) < self.disjunct(slot, pos).right.len() {
      Some(ConnPos { offset: next, ..pos })
    } else {
      None
    }
  }

  fn next_left(&self, slot: u32, pos: ConnPos) -> Option<ConnPos> {
    let next = pos.offset + 1;
    if (next as usize) < self.disjunct(slot, pos).left.len() {
      Some(ConnPos { offset: next, ..pos })
    } else {
      None
    }
  }

  fn length_limit(&self, c: &Connector) -> Option<usize> {
    if self.all_short || c.short {
      Some(self.short_length)
    } else {
      None
    }
  }

  fn fits(&self, c: &Connector, distance: usize) -> bool {
    self.length_limit(c).is_none_or(|limit| distance <= limit)
  }

  /// Whether `upper`, emitted right from `lw`, can link with `lower`, emitted left from `rw`
  fn can_link(&self, lw: u32, upper: &Connector, rw: u32, lower: &Connector) -> bool {
    let distance = (rw - lw) as usize;
    matches(upper, lower) && self.fits(upper, distance) && self.fits(lower, distance)
  }

  fn push_table(&mut self, table: Table) -> TableIdx {
    self.bytes += table.bytes();
    self.tables.push(table);
    TableIdx((self.tables.len() - 1) as u32)
  }

  fn count(&mut self, key: Key) -> TableIdx {
    if let Some(&t) = self.memo.get(&key) {
      return t;
    }
    if self.governor.check(self.bytes).is_exhausted() {
      return ZERO;
    }

    let steps_before = self.steps.len();
    let table = self.compute(key);
    self.bytes += (self.steps.len() - steps_before) * size_of::<Step>();
    let idx = match table.count {
      0 if table.best.is_empty() => ZERO,
      1 if table.best == [EMPTY] => ONE,
      _ => self.push_table(table),
    };

    // a table finished after the budget ran out may be missing completions
    if !self.governor.status().is_exhausted() {
      self.memo.insert(key, idx);
      self.bytes += size_of::<(Key, TableIdx)>() * 2;
    }
    idx
  }

  fn compute(&mut self, key: Key) -> Table {
    let Key { lw, rw, le, re, nulls } = key;
    let span = (rw - lw - 1) as usize;

    if span == 0 {
      return if le.is_none() && re.is_none() && nulls == 0 {
        self.tables[ONE.0 as usize].clone()
      } else {
        Table::default()
      };
    }
    if nulls as usize > span {
      return Table::default();
    }
    if le.is_none() && re.is_none() {
      if lw == 0 || self.islands_ok {
        return self.islands(key);
      }
      return if nulls as usize == null_tiers(span, self.null_block) {
        self.tables[ONE.0 as usize].clone()
      } else {
        Table::default()
      };
    }

    let mut start = lw + 1;
    let mut end = rw;
    match (le, re) {
      (Some(le), _) => {
        if let Some(limit) = self.length_limit(self.right_conn(lw, le)) {
          end = end.min(lw + limit as u32 + 1);
        }
      }
      (None, Some(re)) => {
        if let Some(limit) = self.length_limit(self.left_conn(rw, re)) {
          start = start.max(rw.saturating_sub(limit as u32));
        }
      }
      (None, None) => {}
    }

    let mut acc = Accumulator::new(self.limit);
    for w in start..end {
      for di in 0..self.disjuncts[w as usize].len() {
        for lnulls in 0..=nulls {
          let rnulls = nulls - lnulls;
          if lnulls > w - lw - 1 || rnulls > rw - w - 1 {
            continue;
          }
          self.split(&mut acc, key, w, di, lnulls, rnulls);
        }
      }
      if self.governor.status().is_exhausted() {
        break;
      }
    }

    if self.verbosity >= 4 {
      trace!(lw, rw, nulls, count = acc.count, "span counted");
    }
    acc.finish(&mut self.steps)
  }

  /// Counts the completions where word `w` uses disjunct `di` and links to `le`, `re`, or both
  fn split(&mut self, acc: &mut Accumulator, key: Key, w: u32, di: usize, lnulls: u32, rnulls: u32) {
    let Key { lw, rw, le, re, .. } = key;
    let d = self.disjuncts[w as usize][di];
    let dl = ConnPos::first(di, &d.left);
    let dr = ConnPos::first(di, &d.right);

    let lmatch = match (le, dl) {
      (Some(le), Some(dl)) => self.can_link(lw, self.right_conn(lw, le), w, self.left_conn(w, dl)),
      _ => false,
    };
    let rmatch = match (dr, re) {
      (Some(dr), Some(re)) => self.can_link(w, self.right_conn(w, dr), rw, self.left_conn(rw, re)),
      _ => false,
    };
    if !lmatch && !rmatch {
      return;
    }

    let chosen = Some((w, di as u32));
    let own = PartialCost {
      disjunct: d.cost,
      length: 0,
    };

    let mut left = Table::default();
    let mut llink = None;
    if let (true, Some(le), Some(dl)) = (lmatch, le, dl) {
      let le_next = self.next_right(lw, le);
      let dl_next = self.next_left(w, dl);
      let mut subs = vec![(le_next, dl_next)];
      let le_multi = self.right_conn(lw, le).multi;
      let dl_multi = self.left_conn(w, dl).multi;
      if le_multi {
        subs.push((Some(le), dl_next));
      }
      if dl_multi {
        subs.push((le_next, Some(dl)));
      }
      if le_multi && dl_multi {
        subs.push((Some(le), Some(dl)));
      }
      left = self.gather(lw, w, &subs, lnulls);
      llink = Some(RawLink { lw, rw: w, lc: le, rc: dl });
    }

    let mut right = Table::default();
    let mut rlink = None;
    if let (true, Some(dr), Some(re)) = (rmatch, dr, re) {
      let dr_next = self.next_right(w, dr);
      let re_next = self.next_left(rw, re);
      let mut subs = vec![(dr_next, re_next)];
      let dr_multi = self.right_conn(w, dr).multi;
      let re_multi = self.left_conn(rw, re).multi;
      if re_multi {
        subs.push((dr_next, Some(re)));
      }
      if dr_multi {
        subs.push((Some(dr), re_next));
      }
      if dr_multi && re_multi {
        subs.push((Some(dr), Some(re)));
      }
      right = self.gather(w, rw, &subs, rnulls);
      rlink = Some(RawLink { lw: w, rw, lc: dr, rc: re });
    }

    let link_length = |link: &Option<RawLink>| PartialCost {
      disjunct: 0,
      length: link.map_or(0, |l| l.length()),
    };

    if left.count > 0 && right.count > 0 {
      let own = own + link_length(&llink) + link_length(&rlink);
      acc.combine(&self.steps, &left, &right, [llink, rlink], chosen, own);
    }

    if left.count > 0 {
      // w's right connectors are satisfied inside (w, rw), not by re
      let t = self.count(Key { lw: w, rw, le: dr, re, nulls: rnulls });
      let rest = self.tables[t.0 as usize].clone();
      let own = own + link_length(&llink);
      acc.combine(&self.steps, &left, &rest, [llink, None], chosen, own);
    }

    if le.is_none() && right.count > 0 {
      let t = self.count(Key { lw, rw: w, le: None, re: dl, nulls: lnulls });
      let rest = self.tables[t.0 as usize].clone();
      let own = own + link_length(&rlink);
      acc.combine(&self.steps, &rest, &right, [None, rlink], chosen, own);
    }
  }

  /// Merges the completions of several sibling subproblems over the same span
  fn gather(&mut self, lw: u32, rw: u32, subs: &[(Option<ConnPos>, Option<ConnPos>)], nulls: u32) -> Table {
    let mut merged = Table::default();
    for &(le, re) in subs {
      let t = self.count(Key { lw, rw, le, re, nulls });
      let table = &self.tables[t.0 as usize];
      merged.count = merged.count.saturating_add(table.count);
      merged.best.extend(table.best.iter().copied());
    }

    if subs.len() > 1 {
      let steps = &self.steps;
      merged.best.sort_by_key(|d| steps[d.0 as usize].cost);
      merged.best.truncate(self.limit);
    }
    merged
  }

  /// A span with nothing to satisfy at either end. The first word either starts a new
  /// piece of linkage or is null. Starting a piece is free; outside island mode only
  /// the virtual left slot may start one, and the rest of the span is all null.
  fn islands(&mut self, key: Key) -> Table {
    let Key { lw, rw, nulls, .. } = key;
    let w = lw + 1;
    let unit = self.tables[ONE.0 as usize].clone();
    let mut acc = Accumulator::new(self.limit);

    for di in 0..self.disjuncts[w as usize].len() {
      let d = self.disjuncts[w as usize][di];
      if !d.left.is_empty() {
        continue;
      }
      let t = self.count(Key {
        lw: w,
        rw,
        le: ConnPos::first(di, &d.right),
        re: None,
        nulls,
      });
      let rest = self.tables[t.0 as usize].clone();
      let own = PartialCost {
        disjunct: d.cost,
        length: 0,
      };
      acc.combine(&self.steps, &unit, &rest, [None, None], Some((w, di as u32)), own);
    }

    let span = (rw - lw - 1) as usize;
    if self.islands_ok {
      if nulls > 0 {
        let t = self.count(Key {
          lw: w,
          rw,
          le: None,
          re: None,
          nulls: nulls - 1,
        });
        let rest = self.tables[t.0 as usize].clone();
        acc.combine(&self.steps, &unit, &rest, [None, None], None, PartialCost::default());
      }
    } else if nulls as usize == null_tiers(span, self.null_block) {
      acc.combine(&self.steps, &unit, &unit, [None, None], None, PartialCost::default());
    }

    acc.finish(&mut self.steps)
  }

  fn extract(&self, root: DerivIdx) -> Candidate<'a> {
    let n = self.num_words();
    let mut chosen: Vec<Option<&'a Disjunct>> = vec![None; n];
    let mut links = Vec::new();

    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
      if idx == EMPTY {
        continue;
      }
      let step = &self.steps[idx.0 as usize];
      for link in step.links.iter().flatten() {
        links.push(Pairing {
          lword: link.lw as usize - 1,
          rword: link.rw as usize - 1,
          left: self.right_conn(link.lw, link.lc),
          right: self.left_conn(link.rw, link.rc),
        });
      }
      if let Some((slot, di)) = step.chosen {
        chosen[slot as usize - 1] = Some(self.disjuncts[slot as usize][di as usize]);
      }
      stack.push(step.right);
      stack.push(step.left);
    }

    links.sort_by(|a, b| a.lword.cmp(&b.lword).then(b.rword.cmp(&a.rword)));
    let null = chosen.iter().map(Option::is_none).collect();
    Candidate { chosen, null, links }
  }

  /// Tries each null count in turn and reads back the cheapest linkages at the first
  /// one that has any
  pub fn run(&mut self, opts: &ParseOptions) -> SearchResult<'a> {
    let n = self.num_words();
    let mut result = SearchResult::default();

    for nulls in opts.null_range() {
      if nulls > n {
        break;
      }
      let t = self.count(Key {
        lw: 0,
        rw: n as u32 + 1,
        le: None,
        re: None,
        nulls: nulls as u32,
      });
      let table = &self.tables[t.0 as usize];
      if self.verbosity >= 3 {
        debug!(nulls, count = table.count, "tried null count");
      }

      if table.count > 0 || !table.best.is_empty() {
        result.null_count = nulls;
        result.found = table.count;
        result.candidates = table.best.iter().map(|&d| self.extract(d)).collect();
        break;
      }
      if self.governor.status().is_exhausted() {
        break;
      }
    }

    if result.found > result.candidates.len() as u64 && self.verbosity >= 2 {
      warn!(
        found = result.found,
        kept = result.candidates.len(),
        "more linkages than linkage_limit, keeping the cheapest"
      );
    }

    result.resources = self.governor.resources();
    result
  }
}

/// Runs the search over a sentence's words, walls included. A sentence of walls
/// alone has exactly one linkage, with no links.
///
/// With `panic_mode`, a search that runs out of resources without finding anything
/// is retried once with every connector limited to `short_length`, under a fresh budget
/// of `panic_max_parse_time` (or `max_parse_time`) and `max_memory`.
pub fn search<'a>(words: &[&'a DisjunctSet], opts: &ParseOptions) -> SearchResult<'a> {
  if words.len() <= 2 {
    return SearchResult {
      found: 1,
      candidates: vec![Candidate {
        chosen: vec![None; words.len()],
        null: vec![false; words.len()],
        links: Vec::new(),
      }],
      ..Default::default()
    };
  }

  let mut search = LinkageSearch::new(words, opts, false);
  let result = search.run(opts);
  if opts.verbosity >= 3 {
    debug!(
      bytes = search.memory_in_use(),
      elapsed = ?search.governor.elapsed(),
      "search finished"
    );
  }

  let exhausted = result.resources.timer_expired || result.resources.memory_exhausted;
  if !(opts.panic_mode && exhausted && result.candidates.is_empty()) || opts.all_short_connectors {
    return result;
  }

  if opts.verbosity >= 1 {
    warn!("search ran out of resources, retrying with short connectors only");
  }
  let mut retry = LinkageSearch::new(words, opts, true);
  retry.governor = ResourceGovernor::new(
    opts.panic_max_parse_time.or(opts.max_parse_time),
    opts.max_memory,
  );
  let mut panicked = retry.run(opts);
  panicked.resources.timer_expired |= result.resources.timer_expired;
  panicked.resources.memory_exhausted |= result.resources.memory_exhausted;
  panicked.panicked = true;
  panicked
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  fn set(formulas: &[&str]) -> DisjunctSet {
    formulas
      .iter()
      .map(|f| Disjunct::parse("w", 0, f).unwrap())
      .collect()
  }

  fn run<'a>(words: &'a [DisjunctSet], opts: &ParseOptions) -> SearchResult<'a> {
    let refs: Vec<&DisjunctSet> = words.iter().collect();
    search(&refs, opts)
  }

  fn labels(c: &Candidate<'_>) -> Vec<(usize, usize)> {
    c.links.iter().map(|l| (l.lword, l.rword)).collect()
  }

  #[test]
  fn test_simple_chain() {
    // LEFT-WALL the dog runs, no right wall
    let words = vec![
      set(&["Wd+"]),
      set(&["D+"]),
      set(&["Wd- D- S+"]),
      set(&["S-"]),
    ];
    let result = run(&words, &ParseOptions::default());
    assert_eq!(result.found, 1);
    assert_eq!(result.null_count, 0);
    assert_eq!(labels(&result.candidates[0]), vec![(0, 2), (1, 2), (2, 3)]);
  }

  #[test]
  fn test_planarity() {
    // a-c and b-d would cross
    let words = vec![set(&["A+ X+"]), set(&["B+"]), set(&["A-"]), set(&["X- B-"])];
    let result = run(&words, &ParseOptions::default());
    assert_eq!(result.found, 0);
    assert!(result.candidates.is_empty());
  }

  #[test]
  fn test_multi_connector() {
    let words = vec![set(&["@A+"]), set(&["A-"]), set(&["A-"])];
    let result = run(&words, &ParseOptions::default());
    assert_eq!(result.found, 1);
    assert_eq!(labels(&result.candidates[0]), vec![(0, 2), (0, 1)]);

    let words = vec![set(&["A+"]), set(&["A-"]), set(&["A-"])];
    assert_eq!(run(&words, &ParseOptions::default()).found, 0);
  }

  #[test]
  fn test_nulls() {
    let words = vec![set(&["A+"]), set(&[]), set(&["A-"])];
    let opts = ParseOptions::default();
    assert_eq!(run(&words, &opts).found, 0);

    let opts = ParseOptions::default().with_null_counts(0, 2);
    let result = run(&words, &opts);
    assert_eq!(result.null_count, 1);
    assert_eq!(result.found, 1);
    assert_eq!(result.candidates[0].null, vec![false, true, false]);

    let mut opts = ParseOptions::default().with_null_counts(0, 2);
    opts.allow_null = false;
    assert_eq!(run(&words, &opts).found, 0);
  }

  #[test]
  fn test_null_block() {
    let words = vec![set(&["A+"]), set(&[]), set(&[]), set(&["A-"])];
    let mut opts = ParseOptions::default().with_null_counts(0, 4);
    opts.null_block = 2;
    let result = run(&words, &opts);
    assert_eq!(result.null_count, 1);
  }

  #[test]
  fn test_islands() {
    let words = vec![set(&["A+"]), set(&["A-"]), set(&["B+"]), set(&["B-"])];
    assert_eq!(run(&words, &ParseOptions::default()).found, 0);

    let opts = ParseOptions::default().with_islands_ok(true);
    let result = run(&words, &opts);
    assert_eq!(result.found, 1);
    assert_eq!(result.null_count, 0);
    assert_eq!(labels(&result.candidates[0]), vec![(0, 1), (2, 3)]);
  }

  #[test]
  fn test_short_connectors() {
    let mut far = Disjunct::parse("w", 0, "A-").unwrap();
    far.left[0].short = true;
    let words = vec![set(&["A+"]), DisjunctSet::default(), DisjunctSet::from(vec![far])];

    let mut opts = ParseOptions::default().with_null_counts(0, 1);
    assert_eq!(run(&words, &opts).null_count, 1);
    opts.short_length = 1;
    assert_eq!(run(&words, &opts).found, 0);
  }

  #[test]
  fn test_cost_ceiling_and_order() {
    let words = vec![
      set(&["A+"]),
      vec![
        Disjunct::parse("w", 2, "A- B+").unwrap(),
        Disjunct::parse("w", 1, "A-").unwrap(),
        Disjunct::parse("w", 3, "A- C+").unwrap(),
      ]
      .into(),
      set(&["B-", "C-"]),
    ];

    let opts = ParseOptions::default().with_null_counts(0, 1);
    let result = run(&words, &opts);
    assert_eq!(result.null_count, 0);
    // the C link is over the disjunct cost ceiling
    assert_eq!(result.found, 1);
    assert_eq!(result.candidates[0].disjunct_cost(), 2);
  }

  #[test]
  fn test_linkage_limit_keeps_cheapest() {
    let words = vec![
      set(&["A+"]),
      vec![
        Disjunct::parse("w", 2, "A-").unwrap(),
        Disjunct::parse("w", 0, "A-").unwrap(),
        Disjunct::parse("w", 1, "A-").unwrap(),
      ]
      .into(),
    ];
    let opts = ParseOptions::default().with_linkage_limit(2);
    let result = run(&words, &opts);
    assert_eq!(result.found, 3);
    let costs: Vec<u32> = result.candidates.iter().map(Candidate::disjunct_cost).collect();
    assert_eq!(costs, vec![0, 1]);
  }

  #[test]
  fn test_out_of_time() {
    let words: Vec<DisjunctSet> = (0..40).map(|_| set(&["@A- @A+", "A+", "A-"])).collect();
    let opts = ParseOptions::default().with_max_parse_time(Duration::ZERO);
    let result = run(&words, &opts);
    assert!(result.resources.timer_expired);
    assert_eq!(result.found, 0);
  }

  #[test]
  fn test_all_short_connectors() {
    // the A link passes over a null word, B joins neighbours
    let words = vec![set(&["A+"]), set(&[]), set(&["A- B+"]), set(&["B-"])];
    let mut opts = ParseOptions::default().with_null_counts(0, 1);
    opts.short_length = 1;
    let result = run(&words, &opts);
    assert_eq!(result.null_count, 1);
    assert_eq!(labels(&result.candidates[0]), vec![(0, 2), (2, 3)]);

    opts.all_short_connectors = true;
    let result = run(&words, &opts);
    assert_eq!(result.found, 0);
    assert!(!result.panicked);

    opts.short_length = 2;
    assert_eq!(run(&words, &opts).found, 1);
  }

  #[test]
  fn test_panic_retry_finds_short_linkage() {
    let words = vec![set(&["A+"]), set(&["A- B+"]), set(&["B-"])];
    let mut opts = ParseOptions::default().with_max_parse_time(Duration::ZERO);
    opts.short_length = 1;
    let result = run(&words, &opts);
    assert!(result.resources.timer_expired);
    assert!(result.candidates.is_empty());

    opts.panic_mode = true;
    opts.panic_max_parse_time = Some(Duration::from_secs(3600));
    let result = run(&words, &opts);
    assert!(result.panicked);
    // the flags still report the first run
    assert!(result.resources.timer_expired);
    assert_eq!(result.found, 1);
    assert_eq!(labels(&result.candidates[0]), vec![(0, 1), (1, 2)]);
  }

  #[test]
  fn test_panic_retry() {
    let words = vec![set(&["A+"]), set(&["A-"])];
    let mut opts = ParseOptions::default().with_max_memory(1);
    opts.panic_mode = true;
    let result = run(&words, &opts);
    assert!(result.panicked);
    assert!(result.resources.memory_exhausted);
  }
}
