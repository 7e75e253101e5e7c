use crate::{
    csg::Operation,
    error::{Error, Result},
};
use std::{array, fmt, str::FromStr};

/// Deepest level an octree may reach. Cells are addressed by 64-bit grid
/// coordinates per axis.
pub const MAX_DEPTH: u32 = 63;

/// One cell of a Boolean octree. Nodes store no geometry; a cell's cube is
/// reconstructed by halving the root cube on the way down.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OctreeNode {
    #[default]
    Empty,
    Full,
    /// Eight children in octant order
    Partial(Box<[OctreeNode; 8]>),
}

impl OctreeNode {
    pub fn leaf(filled: bool) -> Self {
        if filled {
            OctreeNode::Full
        } else {
            OctreeNode::Empty
        }
    }

    /// Builds an interior node, collapsing it when all children are the same leaf
    pub fn partial(children: [OctreeNode; 8]) -> Self {
        if children.iter().all(|c| *c == OctreeNode::Full) {
            OctreeNode::Full
        } else if children.iter().all(|c| *c == OctreeNode::Empty) {
            OctreeNode::Empty
        } else {
            OctreeNode::Partial(Box::new(children))
        }
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, OctreeNode::Partial(_))
    }

    pub fn is_full(&self) -> bool {
        matches!(self, OctreeNode::Full)
    }

    pub fn children(&self) -> Option<&[OctreeNode; 8]> {
        match self {
            OctreeNode::Partial(children) => Some(children),
            _ => None,
        }
    }

    /// Collapses every uniform subtree bottom-up
    pub fn simplified(self) -> Self {
        match self {
            OctreeNode::Partial(children) => {
                let [a, b, c, d, e, f, g, h] = *children;
                Self::partial([a, b, c, d, e, f, g, h].map(OctreeNode::simplified))
            }
            leaf => leaf,
        }
    }

    /// Complement, swapping Full and Empty at every leaf
    pub fn inverted(&self) -> Self {
        match self {
            OctreeNode::Empty => OctreeNode::Full,
            OctreeNode::Full => OctreeNode::Empty,
            OctreeNode::Partial(children) => {
                OctreeNode::Partial(Box::new(array::from_fn(|i| children[i].inverted())))
            }
        }
    }

    /// Node-by-node boolean combination of two trees over the same cube
    pub fn combine(&self, other: &Self, op: Operation) -> Self {
        match (self, other) {
            (OctreeNode::Partial(left), OctreeNode::Partial(right)) => {
                Self::partial(array::from_fn(|i| left[i].combine(&right[i], op)))
            }
            (OctreeNode::Partial(_), leaf) => {
                let filled = leaf.is_full();
                Self::against_leaf(self, |inside| op.apply(inside, filled))
            }
            (leaf, OctreeNode::Partial(_)) => {
                let filled = leaf.is_full();
                Self::against_leaf(other, |inside| op.apply(filled, inside))
            }
            (left, right) => Self::leaf(op.apply(left.is_full(), right.is_full())),
        }
    }

    /// Result of combining `partial` with a leaf, given the truth table
    /// restricted to that leaf's value
    fn against_leaf(partial: &Self, table: impl Fn(bool) -> bool) -> Self {
        match (table(false), table(true)) {
            (false, false) => OctreeNode::Empty,
            (true, true) => OctreeNode::Full,
            (false, true) => partial.clone(),
            (true, false) => partial.inverted(),
        }
    }

    fn encode(&self, out: &mut String) {
        match self {
            OctreeNode::Empty => out.push('W'),
            OctreeNode::Full => out.push('B'),
            OctreeNode::Partial(children) => {
                out.push('(');
                for child in children.iter() {
                    child.encode(out);
                }
            }
        }
    }

    fn decode(chars: &mut impl Iterator<Item = (usize, char)>, len: usize) -> Result<Self> {
        // Interior nodes still waiting for children, with how many they have
        let mut open: Vec<([OctreeNode; 8], usize)> = Vec::new();

        'symbols: loop {
            let mut node = match chars.next() {
                Some((_, 'B')) => OctreeNode::Full,
                Some((_, 'W')) => OctreeNode::Empty,
                Some((position, '(')) => {
                    if open.len() >= MAX_DEPTH as usize {
                        return Err(Error::Parse {
                            position,
                            found: format!("nesting deeper than {} levels", MAX_DEPTH),
                        });
                    }
                    open.push((Default::default(), 0));
                    continue;
                }
                Some((position, c)) => {
                    return Err(Error::Parse {
                        position,
                        found: c.to_string(),
                    })
                }
                None => {
                    return Err(Error::Parse {
                        position: len,
                        found: "end of input".to_string(),
                    })
                }
            };

            while let Some((mut children, filled)) = open.pop() {
                children[filled] = node;
                if filled + 1 < children.len() {
                    open.push((children, filled + 1));
                    continue 'symbols;
                }
                node = OctreeNode::Partial(Box::new(children));
            }
            return Ok(node);
        }
    }

    /// Number of levels below this node
    pub fn depth(&self) -> u32 {
        match self {
            OctreeNode::Partial(children) => {
                1 + children.iter().map(OctreeNode::depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

/// `B` for a full cell, `W` for an empty one, `(` followed by the eight
/// children for a partial one. There is no closing character.
impl fmt::Display for OctreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.encode(&mut out);
        f.write_str(&out)
    }
}

impl FromStr for OctreeNode {
    type Err = Error;

    /// Whitespace between symbols is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s
            .char_indices()
            .filter(|(_, c)| !c.is_whitespace());
        let node = Self::decode(&mut chars, s.len())?;

        match chars.next() {
            Some((position, c)) => Err(Error::Parse {
                position,
                found: c.to_string(),
            }),
            None => Ok(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half() -> OctreeNode {
        "(BWBWBWBW".parse().unwrap()
    }

    #[test]
    fn test_encoding() {
        let node = OctreeNode::Partial(Box::new([
            OctreeNode::Full,
            OctreeNode::Empty,
            half(),
            OctreeNode::Empty,
            OctreeNode::Empty,
            OctreeNode::Empty,
            OctreeNode::Empty,
            OctreeNode::Full,
        ]));
        assert_eq!(node.to_string(), "(BW(BWBWBWBWWWWWB");
        assert_eq!(node.to_string().parse::<OctreeNode>().unwrap(), node);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "(BWB".parse::<OctreeNode>(),
            Err(Error::Parse { position: 4, .. })
        ));
        assert!(matches!(
            "BW".parse::<OctreeNode>(),
            Err(Error::Parse { position: 1, .. })
        ));
        match "(BWX".parse::<OctreeNode>() {
            Err(Error::Parse { position, found }) => {
                assert_eq!(position, 3);
                assert_eq!(found, "X");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!("".parse::<OctreeNode>().is_err());
    }

    /// Chain of interior nodes, each holding the next in its last octant
    fn chain(levels: usize) -> String {
        format!("{}B", "(WWWWWWW".repeat(levels))
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let deepest: OctreeNode = chain(MAX_DEPTH as usize).parse().unwrap();
        assert_eq!(deepest.depth(), MAX_DEPTH);
        assert_eq!(deepest.to_string(), chain(MAX_DEPTH as usize));

        match chain(MAX_DEPTH as usize + 1).parse::<OctreeNode>() {
            Err(Error::Parse { position, .. }) => assert_eq!(position, 8 * MAX_DEPTH as usize),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            "(".repeat(200_000).parse::<OctreeNode>(),
            Err(Error::Parse { position: 63, .. })
        ));
    }

    #[test]
    fn test_partial_collapses_uniform_children() {
        assert_eq!(
            OctreeNode::partial(Default::default()),
            OctreeNode::Empty
        );
        let full: OctreeNode = "(BBBBBBBB".parse().unwrap();
        assert!(!full.is_leaf());
        assert_eq!(full.simplified(), OctreeNode::Full);

        let nested: OctreeNode = format!("({}{}BBBBBB", "(BBBBBBBB", "(BBBBBBBB")
            .parse()
            .unwrap();
        assert_eq!(nested.simplified(), OctreeNode::Full);
    }

    #[test]
    fn test_inverted() {
        assert_eq!(half().inverted().to_string(), "(WBWBWBWB");
        assert_eq!(half().inverted().inverted(), half());
    }

    #[test]
    fn test_combine_leaves() {
        use OctreeNode::{Empty, Full};

        for &(a, b) in &[(false, false), (false, true), (true, false), (true, true)] {
            for &op in &[
                Operation::Union,
                Operation::Intersection,
                Operation::Difference,
            ] {
                let result = OctreeNode::leaf(a).combine(&OctreeNode::leaf(b), op);
                assert_eq!(result, OctreeNode::leaf(op.apply(a, b)));
            }
        }
        assert_eq!(Full.combine(&Empty, Operation::Difference), Full);
    }

    #[test]
    fn test_combine_leaf_with_partial() {
        let full = OctreeNode::Full;
        let empty = OctreeNode::Empty;

        assert_eq!(full.combine(&half(), Operation::Union), OctreeNode::Full);
        assert_eq!(empty.combine(&half(), Operation::Union), half());
        assert_eq!(half().combine(&empty, Operation::Intersection), OctreeNode::Empty);
        assert_eq!(half().combine(&full, Operation::Intersection), half());
        assert_eq!(full.combine(&half(), Operation::Difference), half().inverted());
        assert_eq!(half().combine(&full, Operation::Difference), OctreeNode::Empty);
        assert_eq!(half().combine(&empty, Operation::Difference), half());
    }

    #[test]
    fn test_combine_partials() {
        let other: OctreeNode = "(WBWBWBWB".parse().unwrap();
        assert_eq!(half().combine(&other, Operation::Union), OctreeNode::Full);
        assert_eq!(half().combine(&other, Operation::Intersection), OctreeNode::Empty);
        assert_eq!(half().combine(&half(), Operation::Difference), OctreeNode::Empty);
    }
}
