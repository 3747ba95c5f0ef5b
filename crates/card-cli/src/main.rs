//! CLI генератора датасета тайских ID-карт
//!
//! Полный конвейер: базовые карты -> аугментация -> нарезка полей.

use anyhow::{Context, Result};
use card_core::{
    Augmentor, AugmentorConfig, CardRenderer, DatasetBuilder, FieldLayout, FontSet,
    LanguageFields, RecordGenerator, RecordSources,
};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Lang {
    Th,
    En,
    All,
}

impl From<Lang> for LanguageFields {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::Th => LanguageFields::Thai,
            Lang::En => LanguageFields::English,
            Lang::All => LanguageFields::All,
        }
    }
}

/// Generate a labeled Thai ID card OCR dataset
#[derive(Debug, Parser)]
#[command(name = "card-dataset", version)]
struct Args {
    /// Output directory
    #[arg(long, default_value = "outputs")]
    output: PathBuf,

    /// Number of base images
    #[arg(long, default_value_t = 80)]
    num_images: usize,

    /// Augmentations per image (0 disables augmentation)
    #[arg(long, default_value_t = 3)]
    num_aug: usize,

    /// Language fields to extract
    #[arg(long, value_enum, default_value_t = Lang::All)]
    lang: Lang,

    /// Field layout configuration (roi_extract.front)
    #[arg(long, default_value = "configs/identity_card/config.json")]
    config: PathBuf,

    /// Card template image; omitted -> plain synthesized background
    #[arg(long)]
    template: Option<PathBuf>,

    /// TTF font used for both Thai and English fields
    #[arg(long, default_value = "fonts/dilleniaupc/DilleniaUPC Bold.ttf")]
    font: PathBuf,

    /// Male given names corpus
    #[arg(long, default_value = "datasets/thai-names/male_names_th.txt")]
    male_names: PathBuf,

    /// Female given names corpus
    #[arg(long, default_value = "datasets/thai-names/female_names_th.txt")]
    female_names: PathBuf,

    /// Family names corpus
    #[arg(long, default_value = "datasets/thai-names/family_names_th.txt")]
    family_names: PathBuf,

    /// Province/district/sub-district corpus
    #[arg(long, default_value = "datasets/thai-province/provinces.json")]
    provinces: PathBuf,

    /// Optional street corpus
    #[arg(long)]
    streets: Option<PathBuf>,

    /// RNG seed (omitted -> entropy)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let layout = FieldLayout::from_file(&args.config)
        .with_context(|| format!("cannot load layout config {:?}", args.config))?;

    let fonts = FontSet::single(&args.font)
        .with_context(|| format!("cannot load font {:?}", args.font))?;

    let template = match &args.template {
        Some(path) => CardRenderer::load_template(path)
            .with_context(|| format!("cannot load template {:?}", path))?,
        None => CardRenderer::blank_template(600, 350),
    };

    let sources = RecordSources::from_files(
        &args.male_names,
        &args.female_names,
        &args.family_names,
        &args.provinces,
        args.streets.as_deref(),
    )
    .context("cannot load record corpora")?;

    let mut generator = match args.seed {
        Some(seed) => RecordGenerator::with_seed(sources, seed),
        None => RecordGenerator::new(sources),
    };
    let renderer = CardRenderer::new(layout, fonts, template);

    let selected = LanguageFields::from(args.lang).field_names();
    let total_cards = args.num_images * (1 + args.num_aug);

    println!("{}", "=".repeat(60));
    println!("Setup completed");
    println!("  Base images: {}", args.num_images);
    println!("  Augmentations per card: {}", args.num_aug);
    println!("  Total cards: {} (base + augmented)", total_cards);
    println!("  Selected fields: {} ({:?})", selected.len(), args.lang);
    println!("  Expected final images: {}", total_cards * selected.len());
    println!("{}", "=".repeat(60));

    let builder = DatasetBuilder::new(&args.output);
    builder.prepare_dirs()?;

    println!("\nGenerating base images...");
    let pb = progress_bar(args.num_images as u64);
    builder.generate_base(&mut generator, &renderer, args.num_images, || pb.inc(1))?;
    pb.finish();

    let include_augmented = args.num_aug > 0;
    if include_augmented {
        println!("\nAugmenting full cards...");
        let config = AugmentorConfig {
            image_size: (600, 350),
            num_augmentations: args.num_aug,
        };
        let mut augmentor = match args.seed {
            Some(seed) => Augmentor::with_seed(config, seed),
            None => Augmentor::new(config),
        };
        let generated = builder.augment_cards(&mut augmentor)?;
        println!("  Generated {} augmented images", generated);
    } else {
        println!("\nSkipping augmentation (num-aug=0)");
    }

    println!("\nCropping fields to final dataset...");
    let count = builder.crop_fields(&selected, include_augmented)?;
    println!("  Cropped {} field images", count);
    println!(
        "  Labels saved to: {:?}",
        builder.final_dir().join("labels.txt")
    );

    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .expect("static progress template"),
    );
    pb
}
