use std::fmt;
use std::ops::Index;

/// Index of a node in a [`ConstituentTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstituentIdx(pub u32);

impl ConstituentIdx {
  fn get(self) -> usize {
    self.0 as usize
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstituentNode {
  /// Phrase label ("S", "NP"), or the word itself for a leaf
  pub label: String,
  /// First and last word covered, inclusive, counting the left wall as word 0
  pub span: (usize, usize),
  pub children: Vec<ConstituentIdx>,
  pub word: bool,
}

impl ConstituentNode {
  pub fn is_word(&self) -> bool {
    self.word
  }
}

/// Phrase structure read off a linkage's domains. Nodes live in one arena; the root is
/// always at index 0 and spans every word between the walls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstituentTree {
  nodes: Vec<ConstituentNode>,
}

impl ConstituentTree {
  pub const ROOT: ConstituentIdx = ConstituentIdx(0);

  /// Nests labelled spans by containment. Spans that cross an enclosing span are
  /// clipped to it, and a span repeating its parent with the same label is dropped.
  pub(crate) fn build(words: &[String], spans: &[(String, (usize, usize))]) -> Self {
    // walls are not part of any phrase
    let (first, last) = (1, words.len().saturating_sub(2));
    let mut tree = Self {
      nodes: vec![ConstituentNode {
        label: "S".to_string(),
        span: (first.min(last), last),
        children: Vec::new(),
        word: false,
      }],
    };
    if first > last {
      return tree;
    }

    let mut spans = spans
      .iter()
      .filter_map(|(label, (lo, hi))| {
        let span = ((*lo).max(first), (*hi).min(last));
        (span.0 <= span.1).then(|| (label.as_str(), span))
      })
      .collect::<Vec<_>>();
    spans.sort_by(|a, b| a.1.0.cmp(&b.1.0).then(b.1.1.cmp(&a.1.1)));

    let mut stack = vec![Self::ROOT];
    for (label, (lo, mut hi)) in spans {
      while let Some(&top) = stack.last() {
        let (tlo, thi) = tree[top].span;
        if tlo <= lo && lo <= thi {
          hi = hi.min(thi);
          break;
        }
        stack.pop();
      }
      let Some(&parent) = stack.last() else {
        continue;
      };
      if tree[parent].span == (lo, hi) && tree[parent].label == label {
        continue;
      }
      let duplicate = tree[parent]
        .children
        .iter()
        .any(|&c| tree[c].span == (lo, hi) && tree[c].label == label);
      if duplicate {
        continue;
      }

      let idx = tree.push(label.to_string(), (lo, hi), false);
      tree.nodes[parent.get()].children.push(idx);
      stack.push(idx);
    }

    tree.attach_words(Self::ROOT, words);
    tree
  }

  fn push(&mut self, label: String, span: (usize, usize), word: bool) -> ConstituentIdx {
    self.nodes.push(ConstituentNode {
      label,
      span,
      children: Vec::new(),
      word,
    });
    ConstituentIdx((self.nodes.len() - 1) as u32)
  }

  /// Fills the gaps between a node's phrase children with word leaves, in order
  fn attach_words(&mut self, idx: ConstituentIdx, words: &[String]) {
    let phrases = std::mem::take(&mut self.nodes[idx.get()].children);
    let (lo, hi) = self.nodes[idx.get()].span;

    let mut children = Vec::with_capacity(phrases.len());
    let mut phrases = phrases.into_iter().peekable();
    let mut pos = lo;
    while pos <= hi {
      match phrases.peek() {
        Some(&p) if self[p].span.0 == pos => {
          phrases.next();
          self.attach_words(p, words);
          pos = self[p].span.1 + 1;
          children.push(p);
        }
        _ => {
          let leaf = self.push(words[pos].clone(), (pos, pos), true);
          children.push(leaf);
          pos += 1;
        }
      }
    }
    self.nodes[idx.get()].children = children;
  }

  pub fn root(&self) -> &ConstituentNode {
    &self[Self::ROOT]
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn get(&self, idx: ConstituentIdx) -> Option<&ConstituentNode> {
    self.nodes.get(idx.get())
  }

  /// The words under a node, left to right
  pub fn leaves(&self, idx: ConstituentIdx) -> Vec<&str> {
    let node = &self[idx];
    if node.is_word() {
      return vec![node.label.as_str()];
    }
    node
      .children
      .iter()
      .flat_map(|&c| self.leaves(c))
      .collect()
  }

  fn fmt_node(&self, idx: ConstituentIdx, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let node = &self[idx];
    if node.is_word() {
      return write!(f, "{}", node.label);
    }
    write!(f, "({}", node.label)?;
    for &child in node.children.iter() {
      write!(f, " ")?;
      self.fmt_node(child, f)?;
    }
    write!(f, ")")
  }
}

impl Index<ConstituentIdx> for ConstituentTree {
  type Output = ConstituentNode;

  fn index(&self, idx: ConstituentIdx) -> &ConstituentNode {
    &self.nodes[idx.get()]
  }
}

impl fmt::Display for ConstituentTree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.fmt_node(Self::ROOT, f)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(ws: &[&str]) -> Vec<String> {
    ws.iter().map(|w| w.to_string()).collect()
  }

  #[test]
  fn test_no_domains() {
    let tree = ConstituentTree::build(&words(&["LEFT-WALL", "the", "boy", "runs", "RIGHT-WALL"]), &[]);
    assert_eq!(tree.to_string(), "(S the boy runs)");
    assert_eq!(tree.root().span, (1, 3));
    assert_eq!(tree.leaves(ConstituentTree::ROOT), vec!["the", "boy", "runs"]);
  }

  #[test]
  fn test_nesting() {
    let ws = words(&["LEFT-WALL", "I", "think", "the", "boy", "runs", "RIGHT-WALL"]);
    let spans = vec![
      ("S".to_string(), (1, 5)),
      ("S".to_string(), (4, 5)),
      ("NP".to_string(), (3, 4)),
      // repeats the one before
      ("NP".to_string(), (3, 4)),
    ];
    let tree = ConstituentTree::build(&ws, &spans);
    // the first S repeats the root and is dropped; the second S crosses the NP and is
    // clipped under it
    assert_eq!(tree.to_string(), "(S I think (NP the (S boy)) runs)");
  }

  #[test]
  fn test_walls_only() {
    let tree = ConstituentTree::build(&words(&["LEFT-WALL", "RIGHT-WALL"]), &[]);
    assert_eq!(tree.to_string(), "(S)");
    assert_eq!(tree.len(), 1);
  }
}
