pub(crate) const TAG_LEN: usize = 7;

/// The closed set of wire tags. See the [module docs](crate::wire) for the
/// full table.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) enum Tag {
    Json,
    Bson,
    Bint,
    Nmpy,
    Npdf,
    Bsos,
    Prqs,
    Prqd,
    List,
    Tupl,
    Dict,
    DicB,
    Pckl,
    Dill,
    Lz4,
}

impl Tag {
    pub(crate) fn prefix(&self) -> &'static [u8; TAG_LEN] {
        match self {
            Tag::Json => b"00json_",
            Tag::Bson => b"00bson_",
            Tag::Bint => b"00bint_",
            Tag::Nmpy => b"00nmpy_",
            Tag::Npdf => b"00npdf_",
            Tag::Bsos => b"00bsos_",
            Tag::Prqs => b"00prqs_",
            Tag::Prqd => b"00prqd_",
            Tag::List => b"00list_",
            Tag::Tupl => b"00tupl_",
            Tag::Dict => b"00dict_",
            Tag::DicB => b"00dicB_",
            Tag::Pckl => b"05pckl_",
            Tag::Dill => b"05dill_",
            Tag::Lz4 => b"00lz4__",
        }
    }

    /// Reads the tag off the front of `blob`. `None` means no recognized
    /// tag, which decoders treat as an unclassified blob, not an error.
    pub(crate) fn parse(blob: &[u8]) -> Option<Tag> {
        if blob.len() < TAG_LEN {
            return None;
        }
        let prefix: &[u8; TAG_LEN] = blob[..TAG_LEN].try_into().ok()?;
        let tag = match prefix {
            b"00json_" => Tag::Json,
            b"00bson_" => Tag::Bson,
            b"00bint_" => Tag::Bint,
            b"00nmpy_" => Tag::Nmpy,
            b"00npdf_" => Tag::Npdf,
            b"00bsos_" => Tag::Bsos,
            b"00prqs_" => Tag::Prqs,
            b"00prqd_" => Tag::Prqd,
            b"00list_" => Tag::List,
            b"00tupl_" => Tag::Tupl,
            b"00dict_" => Tag::Dict,
            b"00dicB_" => Tag::DicB,
            b"05pckl_" => Tag::Pckl,
            b"05dill_" => Tag::Dill,
            b"00lz4__" => Tag::Lz4,
            _ => return None,
        };
        Some(tag)
    }

    pub(crate) fn wrap(self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(TAG_LEN + payload.len());
        out.extend_from_slice(self.prefix());
        out.extend_from_slice(payload);
        out
    }
}

#[cfg(test)]
mod test {
    use super::{Tag, TAG_LEN};

    const ALL: [Tag; 15] = [
        Tag::Json,
        Tag::Bson,
        Tag::Bint,
        Tag::Nmpy,
        Tag::Npdf,
        Tag::Bsos,
        Tag::Prqs,
        Tag::Prqd,
        Tag::List,
        Tag::Tupl,
        Tag::Dict,
        Tag::DicB,
        Tag::Pckl,
        Tag::Dill,
        Tag::Lz4,
    ];

    #[test]
    fn prefixes_are_distinct_and_well_formed() {
        for (i, tag) in ALL.iter().enumerate() {
            let prefix = tag.prefix();
            assert_eq!(prefix.len(), TAG_LEN);
            assert!(prefix.is_ascii());
            assert_eq!(prefix[TAG_LEN - 1], b'_');
            for other in &ALL[i + 1..] {
                assert_ne!(prefix, other.prefix());
            }
        }
    }

    #[test]
    fn parse_inverts_prefix() {
        for tag in ALL {
            assert_eq!(Tag::parse(&tag.wrap(b"payload")), Some(tag));
        }
    }

    #[test]
    fn unknown_or_short_prefixes_do_not_parse() {
        assert_eq!(Tag::parse(b"00zzzz_payload"), None);
        assert_eq!(Tag::parse(b"00json"), None);
        assert_eq!(Tag::parse(b""), None);
        assert_eq!(Tag::parse(b"some plain bytes"), None);
    }
}
