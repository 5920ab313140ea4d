use crate::fasta::FastaReader;
use crate::fastq::{FastqPairReader, FastqReader};
use crate::reader::{detect_file_format, Reader};
use crate::seq::{SeqFormat, Sequence};
use crossbeam_channel::{bounded, unbounded};
use scoped_threadpool::Pool;
use std::io::{Error, ErrorKind, Result};
use std::path::PathBuf;

pub fn create_reader(file_pair: &[PathBuf]) -> Result<Box<dyn Reader>> {
    match detect_file_format(&file_pair[0])? {
        SeqFormat::Fastq => {
            if let Some(file2) = file_pair.get(1) {
                Ok(Box::new(FastqPairReader::from_path(&file_pair[0], file2)?))
            } else {
                Ok(Box::new(FastqReader::from_path(&file_pair[0])?))
            }
        }
        SeqFormat::Fasta => Ok(Box::new(FastaReader::from_path(&file_pair[0])?)),
    }
}

/// Bounded fan-out with a serial reducer. `n_workers` threads pull item
/// indices off a shared queue and run `work`; the caller's thread runs
/// `reduce` on results in arrival order. The completion channel is bounded
/// at `n_workers`, so never more than `n_workers` unreduced results exist
/// and `submitted - reduced` stays within the pool size. The first error
/// from either side aborts reduction; remaining results are drained and
/// dropped.
pub fn reduce_parallel<T, O, W, R>(
    items: &[T],
    n_workers: usize,
    work: W,
    mut reduce: R,
) -> Result<()>
where
    T: Sync,
    O: Send,
    W: Fn(usize, &T) -> Result<O> + Sync,
    R: FnMut(usize, O) -> Result<()>,
{
    let n_workers = n_workers.clamp(1, items.len().max(1));
    let (task_tx, task_rx) = unbounded::<usize>();
    for i in 0..items.len() {
        task_tx.send(i).expect("task queue closed early");
    }
    drop(task_tx);

    let (done_tx, done_rx) = bounded::<(usize, Result<O>)>(n_workers);
    let mut pool = Pool::new(n_workers as u32);
    let mut first_err = None;

    pool.scoped(|scope| {
        for _ in 0..n_workers {
            let task_rx = task_rx.clone();
            let done_tx = done_tx.clone();
            let work = &work;
            scope.execute(move || {
                while let Ok(i) = task_rx.recv() {
                    let out = work(i, &items[i]);
                    if done_tx.send((i, out)).is_err() {
                        break;
                    }
                }
            });
        }
        // The scope's own copy must drop so the receive loop can end.
        drop(done_tx);

        while let Ok((index, out)) = done_rx.recv() {
            match out {
                Ok(out) if first_err.is_none() => {
                    if let Err(e) = reduce(index, out) {
                        first_err = Some(e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
    });

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Chunked, order-preserving pool driver. Reads up to `chunk_size` records,
/// splits the chunk into groups of `per_set` records (`per_set` must be a
/// power of two), runs `work` on the groups concurrently, concatenates the
/// group buffers in input order and hands the chunk's buffer to `sink` for
/// a single write. Repeats until the reader is exhausted.
pub fn chunk_parallel<W, S>(
    reader: &mut dyn Reader,
    n_threads: usize,
    chunk_size: usize,
    per_set: usize,
    work: W,
    mut sink: S,
) -> Result<()>
where
    W: Fn(&[Sequence]) -> Vec<u8> + Sync,
    S: FnMut(Vec<u8>) -> Result<()>,
{
    if !per_set.is_power_of_two() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("per_set must be a power of two, got {}", per_set),
        ));
    }
    let group_len = per_set * reader.step();
    let mut pool = Pool::new(n_threads.max(1) as u32);
    let mut chunk: Vec<Sequence> = Vec::new();
    let mut first = true;

    loop {
        chunk.clear();
        let records = reader.read_chunk(chunk_size, &mut chunk)?;
        if records == 0 {
            if first {
                eprintln!("Could not get any sequences from input, fyi.");
            }
            break;
        }
        first = false;

        let mut outputs: Vec<Vec<u8>> = vec![Vec::new(); chunk.len().div_ceil(group_len)];
        pool.scoped(|scope| {
            for (group, out) in chunk.chunks(group_len).zip(outputs.iter_mut()) {
                let work = &work;
                scope.execute(move || {
                    *out = work(group);
                });
            }
        });

        let total: usize = outputs.iter().map(|b| b.len()).sum();
        let mut buf = Vec::with_capacity(total);
        for out in &outputs {
            buf.extend_from_slice(out);
        }
        sink(buf)?;
    }

    Ok(())
}
