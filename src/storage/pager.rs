//! Pager - the page cache between the B-tree and the backing file.
//!
//! The [`Pager`] owns the file handle and a fixed-size table of in-memory
//! page buffers. Pages are loaded lazily on first access and written back
//! in full at flush time.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::debug;

use crate::common::config::{PAGE_SIZE, TABLE_MAX_PAGES};
use crate::common::PageId;
use crate::error::{Error, Result};
use crate::storage::page::Page;

/// Caches pages of a single database file.
///
/// # File Layout
/// The database is stored as a single file with pages laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`. The file length must
/// always be a whole multiple of the page size; anything else is treated
/// as corruption at open time.
///
/// # Caching
/// The page table holds [`TABLE_MAX_PAGES`] slots, each lazily filled the
/// first time its page number is requested. A page beyond the current end
/// of the file is handed out zeroed and extends the logical page count.
/// Pages are never evicted and never reused; there is no free list.
///
/// # Durability
/// Loaded pages are mutated in place and only guaranteed persisted by
/// [`Pager::flush_all`] (normally at table close). There is no write-ahead
/// log; a crash mid-flush can leave the file inconsistent.
///
/// # Thread Safety
/// `Pager` is **single-threaded**. Exactly one logical operation runs
/// against it at a time.
pub struct Pager {
    file: File,
    /// Pages resident in the file when it was opened.
    file_pages: u32,
    /// Highest page number handed out so far, plus one. Starts at
    /// `file_pages` and grows as fresh pages are materialized.
    num_pages: u32,
    /// Lazily filled page table, one slot per possible page.
    pages: Vec<Option<Box<Page>>>,
}

impl Pager {
    /// Open a database file, creating it if it does not exist.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be opened.
    /// - `Error::CorruptFile` if the file length is not a whole multiple
    ///   of the page size.
    /// - `Error::PageOutOfBounds` if the file holds more pages than the
    ///   fixed page table can address.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let file_len = file.metadata()?.len();
        if file_len % PAGE_SIZE as u64 != 0 {
            return Err(Error::CorruptFile(file_len));
        }
        let file_pages = (file_len / PAGE_SIZE as u64) as u32;
        if file_pages > TABLE_MAX_PAGES {
            return Err(Error::PageOutOfBounds(file_pages - 1));
        }

        let mut pages = Vec::with_capacity(TABLE_MAX_PAGES as usize);
        pages.resize_with(TABLE_MAX_PAGES as usize, || None);

        Ok(Self {
            file,
            file_pages,
            num_pages: file_pages,
            pages,
        })
    }

    /// Number of pages the table currently uses (loaded or on disk).
    #[inline]
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// The next unallocated page number.
    ///
    /// Pages are appended at the end of the file and never reclaimed, so
    /// this is simply the current page count.
    #[inline]
    pub fn unused_page_num(&self) -> PageId {
        PageId::new(self.num_pages)
    }

    /// Get the in-memory buffer for a page, loading it on first access.
    ///
    /// A cache miss reads the page from the file when it exists on disk;
    /// otherwise the buffer starts zeroed and the page count is extended
    /// to cover it.
    ///
    /// # Errors
    /// - `Error::PageOutOfBounds` if `page_num` is at or beyond
    ///   [`TABLE_MAX_PAGES`].
    /// - `Error::Io` on a failed read.
    pub fn page(&mut self, page_num: PageId) -> Result<&mut Page> {
        if page_num.0 >= TABLE_MAX_PAGES {
            return Err(Error::PageOutOfBounds(page_num.0));
        }

        if self.pages[page_num.index()].is_none() {
            // Cache miss: allocate a buffer and fill it from the file if
            // the page already exists there.
            let mut page = Box::new(Page::new());
            if page_num.0 < self.file_pages {
                let offset = page_num.0 as u64 * PAGE_SIZE as u64;
                self.file.seek(SeekFrom::Start(offset))?;
                self.file.read_exact(page.as_mut_slice())?;
                debug!("loaded {} from disk", page_num);
            } else {
                debug!("materialized fresh {}", page_num);
            }
            self.pages[page_num.index()] = Some(page);

            if page_num.0 >= self.num_pages {
                self.num_pages = page_num.0 + 1;
            }
        }

        Ok(self.pages[page_num.index()].get_or_insert_with(|| Box::new(Page::new())))
    }

    /// Get two distinct pages mutably at once, loading either on demand.
    ///
    /// Needed by the split path, which reads one leaf while writing
    /// another.
    ///
    /// # Panics
    /// Panics if `a == b`.
    pub fn page_pair(&mut self, a: PageId, b: PageId) -> Result<(&mut Page, &mut Page)> {
        assert_ne!(a, b, "page_pair requires two distinct pages");

        // Materialize both before splitting the borrow.
        self.page(a)?;
        self.page(b)?;

        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.pages.split_at_mut(hi.index());
        let lo_page = match head[lo.index()].as_deref_mut() {
            Some(page) => page,
            None => return Err(Error::PageOutOfBounds(lo.0)),
        };
        let hi_page = match tail[0].as_deref_mut() {
            Some(page) => page,
            None => return Err(Error::PageOutOfBounds(hi.0)),
        };

        if a < b {
            Ok((lo_page, hi_page))
        } else {
            Ok((hi_page, lo_page))
        }
    }

    /// Write a page's full buffer to its file offset.
    ///
    /// # Errors
    /// - `Error::FlushUnloadedPage` if the page was never materialized.
    /// - `Error::Io` on a failed write.
    pub fn flush(&mut self, page_num: PageId) -> Result<()> {
        let page = match self.pages.get(page_num.index()).and_then(|p| p.as_deref()) {
            Some(page) => page,
            None => return Err(Error::FlushUnloadedPage(page_num.0)),
        };

        let offset = page_num.0 as u64 * PAGE_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;
        Ok(())
    }

    /// Flush every loaded page up to the page count, then fsync once.
    ///
    /// Slots that were never materialized are skipped: they are either
    /// already on disk unchanged or were never part of the table.
    pub fn flush_all(&mut self) -> Result<()> {
        for page_num in 0..self.num_pages {
            if self.pages[page_num as usize].is_some() {
                self.flush(PageId::new(page_num))?;
            }
        }
        self.file.sync_all()?;
        // Every flushed page is now file-resident.
        self.file_pages = self.file_pages.max(self.num_pages);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_new_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), 0);
        assert_eq!(pager.unused_page_num(), PageId::new(0));
    }

    #[test]
    fn test_open_ragged_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, [0u8; 100]).unwrap();

        match Pager::open(&path) {
            Err(Error::CorruptFile(100)) => {}
            other => panic!("expected CorruptFile(100), got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_open_oversized_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        // One page past the fixed table, but page-aligned.
        let oversized = (TABLE_MAX_PAGES as usize + 1) * PAGE_SIZE;
        std::fs::write(&path, vec![0u8; oversized]).unwrap();

        match Pager::open(&path) {
            Err(Error::PageOutOfBounds(n)) => assert_eq!(n, TABLE_MAX_PAGES),
            other => panic!("expected PageOutOfBounds, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_open_file_at_exact_page_budget() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, vec![0u8; TABLE_MAX_PAGES as usize * PAGE_SIZE]).unwrap();

        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.num_pages(), TABLE_MAX_PAGES);
        pager.flush_all().unwrap();
    }

    #[test]
    fn test_fresh_page_is_zeroed_and_extends_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        let page = pager.page(PageId::new(0)).unwrap();
        assert_eq!(page.as_slice()[0], 0);
        assert_eq!(page.as_slice()[4095], 0);
        assert_eq!(pager.num_pages(), 1);
        assert_eq!(pager.unused_page_num(), PageId::new(1));
    }

    #[test]
    fn test_page_out_of_bounds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        match pager.page(PageId::new(TABLE_MAX_PAGES)) {
            Err(Error::PageOutOfBounds(n)) => assert_eq!(n, TABLE_MAX_PAGES),
            other => panic!("expected PageOutOfBounds, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_flush_unloaded_page_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        match pager.flush(PageId::new(0)) {
            Err(Error::FlushUnloadedPage(0)) => {}
            other => panic!("expected FlushUnloadedPage, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        // First session: write two pages.
        {
            let mut pager = Pager::open(&path).unwrap();
            pager.page(PageId::new(0)).unwrap().as_mut_slice()[0] = 0xAB;
            pager.page(PageId::new(1)).unwrap().as_mut_slice()[4095] = 0xCD;
            pager.flush_all().unwrap();
        }

        // Second session: read them back.
        {
            let mut pager = Pager::open(&path).unwrap();
            assert_eq!(pager.num_pages(), 2);
            assert_eq!(pager.page(PageId::new(0)).unwrap().as_slice()[0], 0xAB);
            assert_eq!(pager.page(PageId::new(1)).unwrap().as_slice()[4095], 0xCD);
        }
    }

    #[test]
    fn test_page_pair_disjoint_buffers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        let (a, b) = pager.page_pair(PageId::new(0), PageId::new(3)).unwrap();
        a.as_mut_slice()[0] = 1;
        b.as_mut_slice()[0] = 2;
        assert_eq!(pager.page(PageId::new(0)).unwrap().as_slice()[0], 1);
        assert_eq!(pager.page(PageId::new(3)).unwrap().as_slice()[0], 2);
        // Page 3 skipped over pages 1 and 2, so the count covers it.
        assert_eq!(pager.num_pages(), 4);
    }

    #[test]
    fn test_page_pair_reversed_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        let (a, b) = pager.page_pair(PageId::new(5), PageId::new(2)).unwrap();
        a.as_mut_slice()[0] = 5;
        b.as_mut_slice()[0] = 2;
        assert_eq!(pager.page(PageId::new(5)).unwrap().as_slice()[0], 5);
        assert_eq!(pager.page(PageId::new(2)).unwrap().as_slice()[0], 2);
    }
}
