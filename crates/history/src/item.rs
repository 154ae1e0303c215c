use {
    crate::{context::AttachmentRef, reaction::ReactionCode, time::PlatformTime},
    imbridge_guid::Service,
};

/// Fields shared by every normalized item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemHeader {
    pub id: String,
    pub chat_id: String,
    pub from_me: bool,
    pub time: PlatformTime,
    pub thread_identifier: Option<String>,
    pub thread_originator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageItem {
    pub header: ItemHeader,
    pub sender: Option<String>,
    pub service: Option<Service>,
    pub text: Option<String>,
    pub subject: Option<String>,
    pub attachments: Vec<AttachmentRef>,
    /// Reactions from the same batch, attached by
    /// [`crate::associate_reactions`].
    pub reactions: Vec<ReactionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionItem {
    pub header: ItemHeader,
    pub sender: Option<String>,
    pub target_message_id: String,
    pub code: ReactionCode,
}

/// Stand-in for a record no registered shape recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhantomItem {
    pub header: ItemHeader,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedItem {
    Message(MessageItem),
    Reaction(ReactionItem),
    Phantom(PhantomItem),
}

impl NormalizedItem {
    pub fn header(&self) -> &ItemHeader {
        match self {
            Self::Message(m) => &m.header,
            Self::Reaction(r) => &r.header,
            Self::Phantom(p) => &p.header,
        }
    }

    pub fn id(&self) -> &str {
        &self.header().id
    }

    pub fn chat_id(&self) -> &str {
        &self.header().chat_id
    }

    pub fn time(&self) -> PlatformTime {
        self.header().time
    }

    pub fn from_me(&self) -> bool {
        self.header().from_me
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Reaction(_) => "reaction",
            Self::Phantom(_) => "phantom",
        }
    }

    pub fn is_phantom(&self) -> bool {
        matches!(self, Self::Phantom(_))
    }
}
