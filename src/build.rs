//! The `build` pipeline: discover, pair, split, pack, describe, archive.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{write_archive, ArchiveEntry};
use crate::config::FileConfig;
use crate::error::MaskpackError;
use crate::labels::{CanonicalClass, LabelTable, MaskScheme};
use crate::pack::{
    export_png, image_file_name, mask_file_name, DatasetMetadata, PackOptions, Packer,
    ResizeFilter, StagedSplit, DEFAULT_SIZE, METADATA_FILE, TRAIN_SPLIT, VAL_SPLIT,
};
use crate::pairs::{collect_pairs_from_roots, Pair};
use crate::raster::{MaskCompositor, OverlapPriority};
use crate::report::{BuildReport, PlannedSample};
use crate::resolve::{ImageResolver, DEFAULT_IMAGE_EXTENSIONS};
use crate::split::split_pairs;
use crate::verify::expected_archive_entries;

pub const DEFAULT_OUT_DIR: &str = "out";
pub const DEFAULT_VAL_COUNT: usize = 8;
pub const DEFAULT_SEED: u64 = 1337;
pub const DEFAULT_ARCHIVE_NAME: &str = "dataset.zip";

/// Everything one `build` run needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    /// Input roots, searched in order.
    pub inputs: Vec<PathBuf>,
    pub out: PathBuf,
    pub val_count: usize,
    pub seed: u64,
    pub priority: OverlapPriority,
    pub scheme: MaskScheme,
    pub size: u32,
    pub resize_filter: ResizeFilter,
    /// Archive file name inside `out`; `None` skips the archive.
    pub archive_name: Option<String>,
    pub export_png: bool,
    pub dry_run: bool,
    /// Extensions tried when `imagePath` does not resolve directly.
    pub extensions: Vec<String>,
    /// Extra label spellings: alias -> canonical class name.
    pub aliases: BTreeMap<String, String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            out: PathBuf::from(DEFAULT_OUT_DIR),
            val_count: DEFAULT_VAL_COUNT,
            seed: DEFAULT_SEED,
            priority: OverlapPriority::default(),
            scheme: MaskScheme::default(),
            size: DEFAULT_SIZE,
            resize_filter: ResizeFilter::default(),
            archive_name: Some(DEFAULT_ARCHIVE_NAME.to_string()),
            export_png: false,
            dry_run: false,
            extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            aliases: BTreeMap::new(),
        }
    }
}

impl BuildOptions {
    /// Layer a config file over these options.
    pub fn with_config(mut self, config: FileConfig) -> Self {
        if let Some(inputs) = config.inputs {
            self.inputs = inputs;
        }
        if let Some(out) = config.out {
            self.out = out;
        }
        if let Some(val_count) = config.val_count {
            self.val_count = val_count;
        }
        if let Some(seed) = config.seed {
            self.seed = seed;
        }
        if let Some(priority) = config.priority {
            self.priority = priority;
        }
        if let Some(scheme) = config.scheme {
            self.scheme = scheme;
        }
        if let Some(size) = config.size {
            self.size = size;
        }
        if let Some(filter) = config.resize_filter {
            self.resize_filter = filter;
        }
        if let Some(name) = config.archive_name {
            self.archive_name = Some(name);
        }
        if let Some(extensions) = config.extensions {
            self.extensions = extensions;
        }
        self.aliases.extend(config.aliases);
        self
    }

    /// Check values that clap and serde cannot.
    pub fn validate(&self) -> Result<(), MaskpackError> {
        if self.inputs.is_empty() {
            return Err(MaskpackError::InvalidConfig(
                "no input directories given (use --inputs or the config file)".to_string(),
            ));
        }
        if self.size == 0 {
            return Err(MaskpackError::InvalidConfig(
                "size must be positive".to_string(),
            ));
        }
        if let Some(name) = &self.archive_name {
            let reserved = expected_archive_entries();
            if name.is_empty() || name.contains(['/', '\\']) || reserved.contains(name) {
                return Err(MaskpackError::InvalidConfig(format!(
                    "archive name '{name}' must be a plain file name not used by the buffers"
                )));
            }
        }
        Ok(())
    }

    pub fn label_table(&self) -> Result<LabelTable, MaskpackError> {
        self.aliases
            .iter()
            .try_fold(LabelTable::for_scheme(self.scheme), |table, (alias, class)| {
                let class = CanonicalClass::from_name(class).ok_or_else(|| {
                    MaskpackError::InvalidConfig(format!(
                        "alias '{alias}' maps to unknown class '{class}'"
                    ))
                })?;
                table.with_alias(alias, class)
            })
    }

    pub fn resolver(&self) -> ImageResolver {
        ImageResolver::with_extensions(&self.extensions)
    }

    pub fn packer(&self) -> Result<Packer, MaskpackError> {
        let compositor = MaskCompositor::new(self.label_table()?, self.priority);
        Ok(Packer::new(
            PackOptions::square(self.size).with_filter(self.resize_filter),
            compositor,
        ))
    }
}

/// Run the whole pipeline, recording progress and skips in `report`.
///
/// Per-sample problems never fail the run. The run fails when no pairs are
/// usable, when a non-empty split packs nothing, or when output cannot be
/// written. Each split is staged under a temporary name as soon as it is
/// packed; nothing appears under the final names until both splits packed.
pub fn run_build(options: &BuildOptions, report: &mut BuildReport) -> Result<(), MaskpackError> {
    options.validate()?;
    report.dry_run = options.dry_run;
    let packer = options.packer()?;

    let pairs = collect_pairs_from_roots(&options.inputs, &options.resolver(), report);
    report.pairs = pairs.len();
    if pairs.is_empty() {
        return Err(MaskpackError::NoUsablePairs);
    }

    let split = split_pairs(pairs, options.seed, options.val_count);
    report.train.planned = split.train.len();
    report.validation.planned = split.validation.len();

    if options.dry_run {
        let train = packer.check(TRAIN_SPLIT, &split.train, report)?;
        report.train.packed = train.len();
        let validation = packer.check(VAL_SPLIT, &split.validation, report)?;
        report.validation.packed = validation.len();

        plan_split(TRAIN_SPLIT, &split.train, &train, report);
        plan_split(VAL_SPLIT, &split.validation, &validation, report);
        return Ok(());
    }

    let out = options.out.as_path();
    let created = !out.exists();
    let train = packer.pack(TRAIN_SPLIT, &split.train, report)?;
    report.train.packed = train.count;
    fs::create_dir_all(out).map_err(MaskpackError::Io)?;

    let train = train
        .stage(out)
        .inspect_err(|_| abandon(out, created, &[]))?;
    let validation = packer
        .pack(VAL_SPLIT, &split.validation, report)
        .and_then(|validation| validation.stage(out))
        .inspect_err(|_| abandon(out, created, &[&train]))?;
    report.validation.packed = validation.count;

    report.output = Some(options.out.clone());
    write_outputs(options, &train, &validation, report)
}

/// Remove staged buffers, and the output directory if this run created it.
fn abandon(out: &Path, created: bool, staged: &[&StagedSplit]) {
    for split in staged {
        split.discard();
    }
    if created {
        let _ = fs::remove_dir(out);
    }
}

fn write_outputs(
    options: &BuildOptions,
    train: &StagedSplit,
    validation: &StagedSplit,
    report: &mut BuildReport,
) -> Result<(), MaskpackError> {
    let out = options.out.as_path();
    let mut entries = Vec::new();

    for split in [train, validation] {
        let [images, masks] = split.commit()?;
        entries.push(ArchiveEntry::new(image_file_name(&split.name), &images));
        entries.push(ArchiveEntry::new(mask_file_name(&split.name), &masks));
        report.written.extend([images, masks]);
    }

    let mut metadata =
        DatasetMetadata::new(train.width, train.height, options.scheme, options.priority)
            .with_counts(train.count, validation.count)
            .with_seed(options.seed);
    if let Some(name) = &options.archive_name {
        metadata = metadata.with_archive(name.as_str());
    }
    let metadata_path = out.join(METADATA_FILE);
    metadata.write(&metadata_path)?;
    entries.push(ArchiveEntry::new(METADATA_FILE, &metadata_path));
    report.written.push(metadata_path);

    if let Some(name) = &options.archive_name {
        let archive_path = out.join(name);
        write_archive(&archive_path, &entries)?;
        report.written.push(archive_path);
    }

    if options.export_png {
        for split in [train, validation] {
            report
                .written
                .extend(export_png(&split.load()?, out, options.scheme)?);
        }
    }

    Ok(())
}

/// List the pairs at `packable` positions under the slots they would fill.
fn plan_split(split: &str, pairs: &[Pair], packable: &[usize], report: &mut BuildReport) {
    for (index, &position) in packable.iter().enumerate() {
        let pair = &pairs[position];
        report.planned.push(PlannedSample {
            split: split.to_string(),
            index,
            image: pair.image.clone(),
            annotation: pair.annotation.clone(),
            image_size: read_image_size(&pair.image),
        });
    }
}

fn read_image_size(path: &Path) -> Option<(u32, u32)> {
    let size = imagesize::size(path).ok()?;
    Some((u32::try_from(size.width).ok()?, u32::try_from(size.height).ok()?))
}
