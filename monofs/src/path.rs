/// Path helpers over plain `str` slices. Volume paths are absolute and
/// slash-delimited; `/` is the root.
pub trait Path {
    fn is_absolute(&self) -> bool;

    /// The path without its leading root, or `None` for the root itself.
    fn root_relative(&self) -> Option<&Self>;

    /// The final component, if there is one.
    fn file_name(&self) -> Option<&Self>;

    /// Splits into `(parent directory, final component)`.
    fn parent_file(&self) -> Option<(&Self, &Self)>;

    fn is_relative(&self) -> bool {
        !self.is_absolute()
    }
}

impl Path for str {
    #[inline]
    fn is_absolute(&self) -> bool {
        self.starts_with('/')
    }

    fn root_relative(&self) -> Option<&Self> {
        debug_assert!(self.is_absolute());

        (self != "/").then_some(self.trim_start_matches('/'))
    }

    fn file_name(&self) -> Option<&Self> {
        let file_name = self.rsplit_once('/')?.1;
        if file_name.is_empty() && self.is_absolute() {
            return None;
        }
        Some(file_name)
    }

    fn parent_file(&self) -> Option<(&Self, &Self)> {
        if self == "/" {
            return None;
        }

        self.rsplit_once('/')
            .map(|(p, f)| if p.is_empty() { ("/", f) } else { (p, f) })
    }
}
