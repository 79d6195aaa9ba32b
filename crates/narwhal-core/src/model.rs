use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node type tag as it appears in upstream payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Statement,
    #[serde(rename = "openquestion")]
    OpenQuestion,
    Answer,
    Quantity,
    Evidence,
    Word,
    Definition,
    Category,
    Comment,
    Navigation,
    Dashboard,
    Control,
    CreateNode,
    EditProfile,
    /// Anything we don't recognize. Ingested as content with default size and no votes.
    Unknown,
}

impl NodeType {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "statement" => Self::Statement,
            "openquestion" | "open-question" | "question" => Self::OpenQuestion,
            "answer" => Self::Answer,
            "quantity" => Self::Quantity,
            "evidence" => Self::Evidence,
            "word" => Self::Word,
            "definition" => Self::Definition,
            "category" => Self::Category,
            "comment" => Self::Comment,
            "navigation" => Self::Navigation,
            "dashboard" => Self::Dashboard,
            "control" => Self::Control,
            "create-node" | "createnode" => Self::CreateNode,
            "edit-profile" | "editprofile" => Self::EditProfile,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Statement => "statement",
            Self::OpenQuestion => "openquestion",
            Self::Answer => "answer",
            Self::Quantity => "quantity",
            Self::Evidence => "evidence",
            Self::Word => "word",
            Self::Definition => "definition",
            Self::Category => "category",
            Self::Comment => "comment",
            Self::Navigation => "navigation",
            Self::Dashboard => "dashboard",
            Self::Control => "control",
            Self::CreateNode => "create-node",
            Self::EditProfile => "edit-profile",
            Self::Unknown => "unknown",
        }
    }

    /// Navigation/control chrome. Never vote-ranked, never hidden.
    pub fn is_system(self) -> bool {
        matches!(
            self,
            Self::Navigation | Self::Dashboard | Self::Control | Self::CreateNode | Self::EditProfile
        )
    }

    /// Types whose net votes participate in ranking.
    pub fn is_vote_ranked(self) -> bool {
        matches!(
            self,
            Self::Statement | Self::OpenQuestion | Self::Answer | Self::Quantity | Self::Evidence
        )
    }

    /// System nodes that sit at the center of the layout unless the caller places them.
    pub fn is_central(self) -> bool {
        matches!(self, Self::Control | Self::Dashboard | Self::Navigation)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    #[default]
    Preview,
    Detail,
}

impl NodeMode {
    pub fn parse(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("detail") {
            Self::Detail
        } else {
            Self::Preview
        }
    }
}

/// Positive/negative vote counts. `net` is derived and never read from upstream; the counts are
/// only set through [`VoteCounts::new`] so it cannot go stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteCounts {
    positive: i64,
    negative: i64,
    net: i64,
}

impl VoteCounts {
    pub fn new(positive: i64, negative: i64) -> Self {
        Self {
            positive,
            negative,
            net: positive.saturating_sub(negative),
        }
    }

    pub fn positive(&self) -> i64 {
        self.positive
    }

    pub fn negative(&self) -> i64 {
        self.negative
    }

    pub fn net(&self) -> i64 {
        self.net
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentNode {
    pub id: String,
    pub node_type: NodeType,
    pub votes: VoteCounts,
    pub mode: NodeMode,
    /// Explicit user choice; wins over the net-vote rule when present.
    pub visibility_preference: Option<bool>,
    pub group: Option<String>,
    /// Opaque upstream payload, passed through untouched.
    pub data: Value,
}

impl ContentNode {
    /// Net votes used for ranking; `0` for types that are not vote-ranked.
    pub fn net_votes(&self) -> i64 {
        if self.node_type.is_vote_ranked() {
            self.votes.net()
        } else {
            0
        }
    }

    pub fn is_hidden(&self) -> bool {
        match self.visibility_preference {
            Some(show) => !show,
            None => self.net_votes() < 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemNode {
    pub id: String,
    pub node_type: NodeType,
    pub mode: NodeMode,
    /// Caller-chosen position; central system nodes default to the origin.
    pub position: Option<(f64, f64)>,
    pub group: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphNode {
    Content(ContentNode),
    System(SystemNode),
}

impl GraphNode {
    pub fn id(&self) -> &str {
        match self {
            Self::Content(n) => &n.id,
            Self::System(n) => &n.id,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Content(n) => n.node_type,
            Self::System(n) => n.node_type,
        }
    }

    pub fn mode(&self) -> NodeMode {
        match self {
            Self::Content(n) => n.mode,
            Self::System(n) => n.mode,
        }
    }

    pub fn net_votes(&self) -> i64 {
        match self {
            Self::Content(n) => n.net_votes(),
            Self::System(_) => 0,
        }
    }

    pub fn is_hidden(&self) -> bool {
        match self {
            Self::Content(n) => n.is_hidden(),
            Self::System(_) => false,
        }
    }

    pub fn as_content(&self) -> Option<&ContentNode> {
        match self {
            Self::Content(n) => Some(n),
            Self::System(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkKind {
    Related,
    Answers,
    Evidence,
    SharedKeyword,
    Categorized,
    Defines,
    Comment,
    Reply,
    Consolidated,
    Other,
}

impl LinkKind {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "related" | "related-to" => Self::Related,
            "answers" | "answer" => Self::Answers,
            "evidence" | "evidence-for" | "supports" => Self::Evidence,
            "shared-keyword" | "keyword" => Self::SharedKeyword,
            "categorized" | "categorized-as" | "category" => Self::Categorized,
            "defines" | "defined-by" | "definition" => Self::Defines,
            "comment" => Self::Comment,
            "reply" => Self::Reply,
            "consolidated" => Self::Consolidated,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Related => "related",
            Self::Answers => "answers",
            Self::Evidence => "evidence",
            Self::SharedKeyword => "shared-keyword",
            Self::Categorized => "categorized",
            Self::Defines => "defines",
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Consolidated => "consolidated",
            Self::Other => "other",
        }
    }

    /// Spring coefficient used when the payload doesn't carry one.
    pub fn default_strength(self) -> f64 {
        match self {
            Self::Answers | Self::Evidence => 0.7,
            Self::Defines | Self::Reply => 0.6,
            Self::Related | Self::Categorized | Self::Comment => 0.4,
            Self::SharedKeyword => 0.3,
            Self::Consolidated => 0.5,
            Self::Other => 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetadata {
    /// In `[0, 1]`.
    pub strength: f64,
    /// Number of underlying relations collapsed into this edge (`>= 1`).
    pub relation_count: u32,
    pub keywords: Vec<String>,
}

impl LinkMetadata {
    pub fn for_kind(kind: LinkKind) -> Self {
        Self {
            strength: kind.default_strength(),
            relation_count: 1,
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphLink {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    pub metadata: LinkMetadata,
}

/// Ingested graph payload. Node order is the upstream order (used as the ranking tie-break).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

impl GraphData {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn content_nodes(&self) -> impl Iterator<Item = &ContentNode> {
        self.nodes.iter().filter_map(GraphNode::as_content)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(GraphNode::id)
    }
}
