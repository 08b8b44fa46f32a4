use indoc::indoc;

use super::TestBook;

#[test]
fn chapter_with_section() {
    let book = TestBook::new()
        .file("README.md", "# Intro\n\nWelcome.\n")
        .file("ch1/README.md", "# Chapter One\n\n## Overview\n")
        .file("ch1/s1.md", "# Section One\n\nText.\n")
        .summary(indoc! {"
            * [Intro](README.md)
            * [Ch1](ch1/README.md)
              * [S1](ch1/s1.md)
        "})
        .build();
    assert_eq!(book.max_level(), Some(2));
    insta::assert_snapshot!(book, @r"
    ├─ log output
    │  WARN gitbook_pandoc::metadata: Metadata file metadata.yaml not found, using default metadata
    ├─ frontmatter-00-README.md
    │ # Intro
    │
    │ Welcome.
    ├─ chapter-1.md
    │ # Chapter One
    │
    │ ### Overview
    ├─ item-1-1-s1.md
    │ ## Section One
    │
    │ Text.
    ");
}

#[test]
fn missing_section_is_synthesized() {
    let book = TestBook::new()
        .file("README.md", "# Intro\n\nWelcome.\n")
        .file("ch1/README.md", "# Chapter One\n")
        .summary(indoc! {"
            * [Intro](README.md)
            * [Ch1](ch1/README.md)
              * [S1](ch1/s1.md)
        "})
        .build();
    assert_eq!(book.max_level(), Some(2));
    insta::assert_snapshot!(book, @r"
    ├─ log output
    │  WARN gitbook_pandoc::summary: Source not found for 'S1': ch1/s1.md
    │  WARN gitbook_pandoc::metadata: Metadata file metadata.yaml not found, using default metadata
    ├─ frontmatter-00-README.md
    │ # Intro
    │
    │ Welcome.
    ├─ chapter-1.md
    │ # Chapter One
    ├─ item-1-1-s1.md
    │ ## S1
    │
    ");
}

#[test]
fn missing_chapter_is_synthesized() {
    let book = TestBook::new()
        .file("ch1/s1.md", "Text without a heading.\n")
        .summary(indoc! {"
            * [Getting Started](ch1/README.md)
              * [S1](ch1/s1.md)
        "})
        .build();
    insta::assert_snapshot!(book, @r"
    ├─ log output
    │  WARN gitbook_pandoc::summary: Source not found for 'Getting Started': ch1/README.md
    │  WARN gitbook_pandoc::metadata: Metadata file metadata.yaml not found, using default metadata
    ├─ chapter-1.md
    │ # Getting Started
    │
    ├─ item-1-1-s1.md
    │ Text without a heading.
    ");
}

#[test]
fn flat_manifest() {
    let book = TestBook::new()
        .file("a.md", "# A\n")
        .summary("* [A](a.md)\n")
        .build();
    assert_eq!(book.max_level(), Some(1));
    assert_eq!(book.fragment_names(), ["frontmatter-00-a.md"]);
}

#[test]
fn flat_manifest_with_primary_index() {
    let book = TestBook::new()
        .file("README.md", "Hello")
        .file("a.md", "# A\n")
        .file("b.md", "# B\n")
        .summary(indoc! {"
            # Summary

            * [A](a.md)
            - [B](b.md)
        "})
        .build();
    assert_eq!(book.max_level(), Some(1));
    insta::assert_snapshot!(book, @r"
    ├─ log output
    │  WARN gitbook_pandoc::metadata: Metadata file metadata.yaml not found, using default metadata
    ├─ frontmatter-00-README.md
    │ Hello
    ├─ frontmatter-01-a.md
    │ # A
    ├─ frontmatter-02-b.md
    │ # B
    ");
}

#[test]
fn missing_front_matter_is_empty() {
    let book = TestBook::new()
        .summary(indoc! {"
            * [Intro](README.md)
            * [Notes](notes.md)
        "})
        .build();
    insta::assert_snapshot!(book, @r"
    ├─ log output
    │  WARN gitbook_pandoc::summary: Source not found for 'Intro': README.md
    │  WARN gitbook_pandoc::summary: Source not found for 'Notes': notes.md
    │  WARN gitbook_pandoc::metadata: Metadata file metadata.yaml not found, using default metadata
    ├─ frontmatter-00-README.md
    ├─ frontmatter-01-notes.md
    ");
}

#[test]
fn sub_chapters() {
    let book = TestBook::new()
        .file("README.md", "Hello")
        .file("part1/README.md", "# Part One")
        .file("part1/basics.md", "# Basics\n## Details")
        .file("part1/advanced/tricks.md", "# Tricks")
        .file("part2/README.md", "# Part Two")
        .summary(indoc! {"
            * [Preface](README.md)
            * [Part 1](part1/README.md)
              * [Basics](part1/basics.md)
              * [Advanced](part1/advanced/README.md)
                * [Tricks](part1/advanced/tricks.md)
              * [Summary](part1/summary.md)
            * [Part 2](part2/README.md)
        "})
        .build();
    assert_eq!(book.max_level(), Some(3));
    insta::assert_snapshot!(book, @r"
    ├─ log output
    │  WARN gitbook_pandoc::summary: Source not found for 'Advanced': part1/advanced/README.md
    │  WARN gitbook_pandoc::summary: Source not found for 'Summary': part1/summary.md
    │  WARN gitbook_pandoc::metadata: Metadata file metadata.yaml not found, using default metadata
    ├─ frontmatter-00-README.md
    │ Hello
    ├─ chapter-1.md
    │ # Part One
    ├─ item-1-1-basics.md
    │ ## Basics
    │ ### Details
    ├─ subchapter-1-2.md
    │ ## Advanced
    │
    ├─ subitem-1-2-1-tricks.md
    │ ### Tricks
    ├─ item-1-3-summary.md
    │ ## Summary
    │
    ├─ chapter-2.md
    │ # Part Two
    ");
}

#[test]
fn repeated_entries_are_skipped() {
    let book = TestBook::new()
        .file("README.md", "# Intro")
        .file("ch1/README.md", "# One")
        .file("ch1/a.md", "# A")
        .summary(indoc! {"
            * [Intro](README.md)
            * [Ch1](ch1/README.md)
              * [A](ch1/a.md)
              * [A again](./ch1/a.md)
              * [A once more](ch1/../ch1/a.md)
            * [Ch1 again](ch1/README.md)
              * [Intro again](README.md)
        "})
        .build();
    assert_eq!(
        book.fragment_names(),
        ["frontmatter-00-README.md", "chapter-1.md", "item-1-1-a.md"]
    );
}

#[test]
fn primary_index_title_defaults_to_preface() {
    let book = TestBook::new()
        .file("README.md", "Hello")
        .file("ch1/README.md", "# One")
        .summary("* [Ch1](ch1/README.md)\n")
        .build();
    assert_eq!(
        book.fragment_names(),
        ["frontmatter-00-README.md", "chapter-1.md"]
    );
}

#[test]
fn entries_outside_a_chapter_are_ignored() {
    let book = TestBook::new()
        .file("a.md", "# A")
        .summary(indoc! {"
              * [Orphan](orphan.md)
            * [A](a.md)
        "})
        .build();
    assert_eq!(book.max_level(), Some(2));
    insta::assert_snapshot!(book, @r"
    ├─ log output
    │  WARN gitbook_pandoc::summary: Ignoring nested entry 'Orphan' (orphan.md) that does not belong to any chapter
    │  WARN gitbook_pandoc::metadata: Metadata file metadata.yaml not found, using default metadata
    ├─ frontmatter-00-a.md
    │ # A
    ");
}

#[test]
fn links_that_are_not_chapters() {
    let book = TestBook::new()
        .file("a b.md", "# Spaced")
        .summary(indoc! {"
            * [Spaced](a%20b.md)
            * [Website](https://example.com/page.md)
            * [Image](cover.png)
            * Plain text
            Not a list item [x](x.md)
        "})
        .build();
    assert_eq!(book.fragment_names(), ["frontmatter-00-a b.md"]);
}
